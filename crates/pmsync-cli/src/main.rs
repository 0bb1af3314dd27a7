//! pmsync CLI
//!
//! Command-line front end for the pmsync issue synchronization engine.

mod cli;
mod commands;
mod error;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} Cross-platform issue sync", "pmsync".green().bold());
            println!();
            println!("Run {} for available commands.", "pmsync --help".cyan());
            Ok(())
        }
    }
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
/// `RUST_LOG` wins over `--verbose` when set.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
    tracing::debug!("Verbose mode enabled");
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Sync(args) => commands::run_sync(&args),
        Commands::Validate { config } => commands::run_validate(&config),
        Commands::History {
            item_id,
            days,
            audit_dir,
            json,
        } => commands::run_history(&audit_dir, &item_id, days, json),
        Commands::Init {
            file,
            source,
            target,
            force,
        } => commands::run_init(&file, source, target, force),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "pmsync", &mut std::io::stdout());
            Ok(())
        }
    }
}
