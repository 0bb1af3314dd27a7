//! Validate command implementation

use std::path::Path;

use colored::Colorize;

use pmsync_core::{EnginePaths, SyncEngine};

use crate::error::{CliError, Result};

/// Run the validate command
///
/// Loads the configuration (range checks happen at load) and reports every
/// problem that would stop a sync from starting.
pub fn run_validate(config: &Path) -> Result<()> {
    println!(
        "{} Validating {}...",
        "=>".blue().bold(),
        config.display().to_string().cyan()
    );

    let problems = check(config)?;

    if problems.is_empty() {
        println!("{} Configuration is valid.", "OK".green().bold());
        return Ok(());
    }

    println!("{} Configuration has problems:", "INVALID".red().bold());
    for problem in &problems {
        println!("   {} {}", "!".red(), problem);
    }
    Err(CliError::user(format!(
        "{} problem(s) found in {}",
        problems.len(),
        config.display()
    )))
}

/// Problems with the configuration at `config`; empty means valid.
pub fn check(config: &Path) -> Result<Vec<String>> {
    // Directories are never touched while validating
    let engine = SyncEngine::from_yaml(config, EnginePaths::under(Path::new(".pmsync")))?;
    Ok(engine.validate_configuration())
}
