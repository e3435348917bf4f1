//! Command-line interface definitions for mediasweep.
//!
//! All arguments, subcommands, and options use the clap derive API, with
//! global options (verbosity, color) and one subcommand per operation.
//!
//! # Example
//!
//! ```bash
//! # Scan a server for duplicate renditions
//! mediasweep scan --server http://localhost:32400 --token XXXX
//!
//! # Preview what keep-largest would reclaim
//! mediasweep reclaim --server http://localhost:32400 --token XXXX --dry-run
//!
//! # Reclaim space by hardlinking instead of deleting
//! mediasweep reclaim --server http://localhost:32400 --token XXXX --hardlink --yes
//!
//! # JSON output for scripting
//! mediasweep scan --server http://localhost:32400 --token XXXX --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::engine::Strategy;

/// Duplicate rendition manager for media servers.
///
/// mediasweep finds media items backed by more than one file, lets a
/// keep-largest or keep-smallest strategy pick survivors, and reclaims the
/// rest by catalog deletion, trash, or hardlink conversion.
#[derive(Debug, Parser)]
#[command(name = "mediasweep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for mediasweep.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the server for items with duplicate renditions
    Scan(ScanArgs),
    /// Scan, select, and reclaim space from duplicate renditions
    Reclaim(ReclaimArgs),
}

/// Server connection options, shared by every subcommand.
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Media server base URL (e.g. http://localhost:32400)
    ///
    /// Falls back to the saved configuration when omitted.
    #[arg(long, value_name = "URL", env = "MEDIASWEEP_SERVER")]
    pub server: Option<String>,

    /// Server access token
    ///
    /// Never persisted to disk; prefer the environment variable so the
    /// token stays out of shell history.
    #[arg(long, value_name = "TOKEN", env = "MEDIASWEEP_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Server connection
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Which rendition to keep when auto-selecting
    #[arg(long, value_enum, default_value_t = StrategyArg::KeepLargest)]
    pub strategy: StrategyArg,

    /// List duplicates without marking any rendition for deletion
    #[arg(long)]
    pub no_auto_select: bool,

    /// Output format (text for humans, json for scripting)
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the reclaim subcommand.
#[derive(Debug, Args)]
pub struct ReclaimArgs {
    /// Server connection
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Which rendition to keep in each group
    #[arg(long, value_enum, default_value_t = StrategyArg::KeepLargest)]
    pub strategy: StrategyArg,

    /// Report what would be reclaimed without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Convert duplicates into hardlinks instead of deleting them
    ///
    /// Requires byte-identical files on the same filesystem; incompatible
    /// pairs are skipped with a reason.
    #[arg(long, conflicts_with = "delete_files")]
    pub hardlink: bool,

    /// Also remove the backing files, not just the catalog records
    ///
    /// Local files go to the system trash; files on network shares are
    /// deleted permanently.
    #[arg(long)]
    pub delete_files: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output format (text for humans, json for scripting)
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Keep strategy as exposed on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyArg {
    /// Keep the largest rendition of each group (best quality)
    #[default]
    KeepLargest,
    /// Keep the smallest rendition of each group (most space reclaimed)
    KeepSmallest,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::KeepLargest => Strategy::KeepLargest,
            StrategyArg::KeepSmallest => Strategy::KeepSmallest,
        }
    }
}

impl std::fmt::Display for StrategyArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyArg::KeepLargest => write!(f, "keep-largest"),
            StrategyArg::KeepSmallest => write!(f, "keep-smallest"),
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Text,
    /// JSON output for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
