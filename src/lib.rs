//! mediasweep - Duplicate Rendition Manager for Media Servers
//!
//! Finds media items backed by more than one file on a Plex-compatible
//! server, applies a keep-largest or keep-smallest strategy, and reclaims
//! the space by catalog deletion, trash, or hardlink conversion.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod logging;
pub mod progress;
pub mod reclaim;
pub mod report;

use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use bytesize::ByteSize;

use crate::catalog::plex::PlexCatalog;
use crate::cli::{Cli, Commands, ConnectionArgs, OutputFormat, ReclaimArgs, ScanArgs};
use crate::config::Config;
use crate::engine::{BatchSpec, Engine, ScanSnapshot, SelectionSet};
use crate::error::ExitCode;
use crate::progress::{BatchProgress, ScanSpinner};
use crate::reclaim::delete::DeleteOptions;
use crate::reclaim::build_requests;
use crate::report::{
    batch_exit_code, render_batch_text, render_scan_text, scan_exit_code, JsonBatchReport,
    JsonScanReport,
};

/// Run the application with parsed CLI arguments.
///
/// # Errors
///
/// Returns an error for connection failures, missing credentials, and
/// worker failures; per-item problems are folded into the reports and the
/// exit code instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    match cli.command {
        Commands::Scan(args) => run_scan(&args, cli.quiet),
        Commands::Reclaim(args) => run_reclaim(&args, cli.quiet),
    }
}

fn connect(connection: &ConnectionArgs, config: &Config) -> Result<PlexCatalog> {
    let server = connection
        .server
        .clone()
        .or_else(|| config.server_url.clone())
        .ok_or_else(|| {
            anyhow!("no server URL; pass --server, set MEDIASWEEP_SERVER, or save one in the config")
        })?;
    let token = connection
        .token
        .clone()
        .ok_or_else(|| anyhow!("no access token; pass --token or set MEDIASWEEP_TOKEN"))?;

    PlexCatalog::new(&server, &token).context("could not set up the server connection")
}

fn remember_connection(server: Option<&str>, strategy: cli::StrategyArg) {
    let mut config = Config::load();
    if let Some(server) = server {
        config.server_url = Some(server.to_string());
    }
    config.strategy = strategy;
    if let Err(e) = config.save() {
        log::debug!("Could not save config: {e:#}");
    }
}

fn scan_snapshot(engine: &Engine, quiet: bool) -> Result<ScanSnapshot> {
    let spinner = ScanSpinner::start(quiet);
    let rx = engine
        .start_scan()
        .map_err(|e| anyhow!("{e}"))?;
    let result = rx
        .recv()
        .map_err(|_| anyhow!("scan worker terminated unexpectedly"))?;
    spinner.clear();
    result.context("scan failed")
}

fn run_scan(args: &ScanArgs, quiet: bool) -> Result<ExitCode> {
    let config = Config::load();
    let client = connect(&args.connection, &config)?;
    let engine = Engine::new(Arc::new(client));

    let snapshot = scan_snapshot(&engine, quiet || args.output == OutputFormat::Json)?;
    let selections =
        SelectionSet::assign_all(&snapshot, args.strategy.into(), !args.no_auto_select);

    match args.output {
        OutputFormat::Text => print!("{}", render_scan_text(&snapshot, &selections)),
        OutputFormat::Json => println!(
            "{}",
            JsonScanReport::new(&snapshot, &selections).to_json_pretty()?
        ),
    }

    remember_connection(args.connection.server.as_deref(), args.strategy);
    Ok(scan_exit_code(&snapshot))
}

fn run_reclaim(args: &ReclaimArgs, quiet: bool) -> Result<ExitCode> {
    let config = Config::load();
    let client = connect(&args.connection, &config)?;
    let engine = Engine::new(Arc::new(client));
    let suppress = quiet || args.output == OutputFormat::Json;

    let snapshot = scan_snapshot(&engine, suppress)?;
    if snapshot.is_empty() {
        if args.output == OutputFormat::Text {
            println!("No duplicate renditions found; nothing to reclaim.");
        }
        return Ok(ExitCode::NoDuplicates);
    }

    let selections = SelectionSet::assign_all(&snapshot, args.strategy.into(), true);
    let requests = build_requests(&snapshot, &selections);

    if args.output == OutputFormat::Text {
        print!("{}", render_scan_text(&snapshot, &selections));
    }

    if !args.dry_run && !args.yes {
        let prompt = confirmation_prompt(
            requests.len(),
            selections.total_reclaimable(&snapshot),
            args.hardlink,
            args.delete_files,
        );
        if !confirm(&prompt)? {
            println!("Aborted; nothing was changed.");
            return Ok(ExitCode::Success);
        }
    }

    let spec = if args.hardlink {
        BatchSpec::Hardlink {
            requests,
            dry_run: args.dry_run,
        }
    } else {
        BatchSpec::Delete {
            requests,
            options: DeleteOptions {
                dry_run: args.dry_run,
                remove_files: args.delete_files,
            },
        }
    };

    let progress = Arc::new(BatchProgress::new(suppress));
    let rx = engine
        .start_batch(spec, Arc::clone(&progress) as Arc<dyn reclaim::ReclaimProgress>)
        .map_err(|e| anyhow!("{e}"))?;
    let outcome = rx
        .recv()
        .map_err(|_| anyhow!("batch worker terminated unexpectedly"))?;
    progress.finish();

    match args.output {
        OutputFormat::Text => print!("{}", render_batch_text(&outcome)),
        OutputFormat::Json => println!("{}", JsonBatchReport::new(outcome.clone()).to_json_pretty()?),
    }

    remember_connection(args.connection.server.as_deref(), args.strategy);
    Ok(batch_exit_code(&outcome))
}

fn confirmation_prompt(count: usize, bytes: u64, hardlink: bool, delete_files: bool) -> String {
    let mut prompt = if hardlink {
        format!(
            "About to replace {count} duplicate files with hardlinks, reclaiming up to {}.\n\
             Their catalog records are removed permanently.",
            ByteSize::b(bytes)
        )
    } else {
        format!(
            "About to delete {count} catalog records, reclaiming up to {}.\n\
             Catalog deletion cannot be undone.",
            ByteSize::b(bytes)
        )
    };
    if delete_files {
        prompt.push_str(
            "\nBacking files will be removed: local files go to the system trash,\n\
             files on network shares are deleted permanently and cannot be recovered.",
        );
    }
    prompt.push_str("\nProceed? [y/N] ");
    prompt
}

fn confirm(prompt: &str) -> Result<bool> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        bail!("confirmation required; re-run with --yes to proceed non-interactively");
    }
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(parse_confirmation(&line))
}

fn parse_confirmation(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_confirmation_accepts_yes() {
        assert!(parse_confirmation("y"));
        assert!(parse_confirmation("Y"));
        assert!(parse_confirmation("yes"));
        assert!(parse_confirmation("  YES \n"));
    }

    #[test]
    fn test_parse_confirmation_defaults_to_no() {
        assert!(!parse_confirmation(""));
        assert!(!parse_confirmation("n"));
        assert!(!parse_confirmation("no"));
        assert!(!parse_confirmation("yep"));
    }

    #[test]
    fn test_confirmation_prompt_warns_about_network_shares() {
        let prompt = confirmation_prompt(3, 1_000_000, false, true);
        assert!(prompt.contains("cannot be undone"));
        assert!(prompt.contains("network shares"));
        assert!(prompt.contains("trash"));
    }

    #[test]
    fn test_confirmation_prompt_hardlink_wording() {
        let prompt = confirmation_prompt(2, 500, true, false);
        assert!(prompt.contains("hardlinks"));
        assert!(!prompt.contains("network shares"));
    }
}
