//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use pmsync_core::{ConflictStrategy, Platform, SyncDirection};

/// pmsync - Keep issues in step across project-management platforms
#[derive(Parser, Debug)]
#[command(name = "pmsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize issues from the source platform to the target
    ///
    /// Examples:
    ///   pmsync sync --config sync.yaml
    ///   pmsync sync --config sync.yaml --dry-run
    ///   pmsync sync --config sync.yaml --direction bidirectional --conflict-resolution newest
    Sync(SyncArgs),

    /// Check a configuration file for problems
    Validate {
        /// Configuration file (YAML, JSON or TOML)
        #[arg(short, long, env = "PMSYNC_CONFIG")]
        config: PathBuf,
    },

    /// Show the audit history of one item
    History {
        /// Item id as seen on the source platform
        item_id: String,

        /// Number of trailing days to scan (today included)
        #[arg(short, long, default_value_t = 7)]
        days: u32,

        /// Audit directory
        #[arg(long, default_value = ".pmsync/audit")]
        audit_dir: PathBuf,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Write a starter configuration file
    Init {
        /// Where to write the configuration (format by extension)
        #[arg(default_value = "pmsync.yaml")]
        file: PathBuf,

        /// Source platform
        #[arg(short, long)]
        source: Platform,

        /// Target platform
        #[arg(short, long)]
        target: Platform,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments of `pmsync sync`
#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    /// Configuration file (YAML, JSON or TOML)
    #[arg(short, long, env = "PMSYNC_CONFIG")]
    pub config: PathBuf,

    /// Expected source platform; must match the configuration
    #[arg(long)]
    pub source: Option<Platform>,

    /// Expected target platform; must match the configuration
    #[arg(long)]
    pub target: Option<Platform>,

    /// Only sync issues of this project
    #[arg(long)]
    pub project: Option<String>,

    /// Preview changes without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Override the configured direction (one-way or bidirectional)
    #[arg(long)]
    pub direction: Option<SyncDirection>,

    /// Override the configured conflict strategy (source, target, newest, manual)
    #[arg(long = "conflict-resolution")]
    pub conflict_resolution: Option<ConflictStrategy>,

    /// Directory holding `<platform>.json` issue files
    #[arg(long, default_value = ".pmsync/data")]
    pub data_dir: PathBuf,

    /// Directory for change-tracking state
    #[arg(long, default_value = ".pmsync/state")]
    pub state_dir: PathBuf,

    /// Directory for the audit trail
    #[arg(long, default_value = ".pmsync/audit")]
    pub audit_dir: PathBuf,

    /// Output the run summary as JSON
    #[arg(long)]
    pub json: bool,
}
