//! mediasweep - Duplicate Rendition Manager
//!
//! Entry point for the mediasweep CLI application.

use clap::Parser;
use mediasweep::{
    cli::{Cli, OutputFormat},
    error::{ExitCode, StructuredError},
};

fn main() {
    let cli = Cli::parse();
    let json_output = match &cli.command {
        mediasweep::cli::Commands::Scan(args) => args.output == OutputFormat::Json,
        mediasweep::cli::Commands::Reclaim(args) => args.output == OutputFormat::Json,
    };

    match mediasweep::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::GeneralError;

            if json_output {
                let structured = StructuredError::new(&err, exit_code);
                if let Ok(json) = serde_json::to_string_pretty(&structured) {
                    eprintln!("{}", json);
                } else {
                    eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
                }
            } else {
                eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            }

            std::process::exit(exit_code.as_i32());
        }
    }
}
