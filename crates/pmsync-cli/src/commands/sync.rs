//! Sync command implementation
//!
//! Issues are read from and written to `<data-dir>/<platform>.json`. When the
//! source and target are the same platform the target lives in
//! `<platform>-target.json` instead.

use colored::Colorize;

use pmsync_core::{
    EnginePaths, JsonFileClient, Platform, SyncConfiguration, SyncEngine, SyncStatus, SyncSummary,
};

use crate::cli::SyncArgs;
use crate::error::{CliError, Result};

/// Run the sync command
///
/// Prints a per-item report and a summary line. Fails when any item failed
/// or stopped on a conflict.
pub fn run_sync(args: &SyncArgs) -> Result<()> {
    if !args.json {
        println!(
            "{} Syncing with {}...",
            "=>".blue().bold(),
            args.config.display().to_string().cyan()
        );
    }

    let summary = execute(args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.is_clean() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} item(s) failed, {} conflict(s) need attention",
            summary.errors, summary.conflicts
        )))
    }
}

/// Load the configuration, apply overrides and run one sync pass.
pub fn execute(args: &SyncArgs) -> Result<SyncSummary> {
    let config = load_config(args)?;
    let (source, target) = clients(args, &config);

    let mut engine = SyncEngine::new(
        config,
        EnginePaths::new(&args.state_dir, &args.audit_dir),
    );
    engine.set_dry_run(args.dry_run);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(engine.sync_project(&source, &target, args.project.as_deref()))?;

    Ok(summary)
}

fn load_config(args: &SyncArgs) -> Result<SyncConfiguration> {
    let mut config = SyncConfiguration::load(&args.config)?;

    check_expected("source", args.source, config.source_platform())?;
    check_expected("target", args.target, config.target_platform())?;

    if let Some(direction) = args.direction {
        tracing::debug!(%direction, "Overriding direction");
        config = config.with_direction(direction);
    }
    if let Some(strategy) = args.conflict_resolution {
        tracing::debug!(%strategy, "Overriding conflict strategy");
        config = config.with_conflict_strategy(strategy);
    }

    Ok(config)
}

fn check_expected(role: &str, expected: Option<Platform>, configured: Platform) -> Result<()> {
    match expected {
        Some(p) if p != configured => Err(CliError::user(format!(
            "--{} {} does not match the configured {} platform '{}'",
            role, p, role, configured
        ))),
        _ => Ok(()),
    }
}

fn clients(args: &SyncArgs, config: &SyncConfiguration) -> (JsonFileClient, JsonFileClient) {
    let source = JsonFileClient::in_dir(&args.data_dir, config.source_platform());
    let target = if config.source_platform() == config.target_platform() {
        let platform = config.target_platform();
        JsonFileClient::new(
            platform,
            args.data_dir.join(format!("{}-target.json", platform)),
        )
    } else {
        JsonFileClient::in_dir(&args.data_dir, config.target_platform())
    };
    (source, target)
}

fn print_summary(summary: &SyncSummary) {
    for result in &summary.results {
        let label = match result.status {
            SyncStatus::Completed => "OK".green().bold(),
            SyncStatus::Skipped => "SKIP".dimmed(),
            SyncStatus::Conflict => "CONFLICT".yellow().bold(),
            SyncStatus::Failed => "FAILED".red().bold(),
        };
        let direction = format!("{} -> {}", result.source_platform, result.target_platform);
        let mut line = format!("   {} {} ({})", label, result.item_id.cyan(), direction.dimmed());
        if !result.changes.is_empty() {
            let fields: Vec<&str> = result.changes.keys().map(String::as_str).collect();
            line.push_str(&format!(" [{}]", fields.join(", ")));
        }
        if let Some(error) = &result.error {
            line.push_str(&format!(": {}", error));
        } else if let Some(reason) = &result.resolution {
            line.push_str(&format!(": {}", reason.dimmed()));
        }
        println!("{}", line);
    }

    println!();
    let prefix = if summary.dry_run {
        "DRY RUN".yellow().bold()
    } else {
        "DONE".green().bold()
    };
    println!(
        "{} {}: {} created, {} updated, {} skipped, {} conflicts, {} errors",
        prefix,
        summary.config_name,
        summary.created,
        summary.updated,
        summary.skipped,
        summary.conflicts,
        summary.errors
    );
}
