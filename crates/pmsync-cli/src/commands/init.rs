//! Init command implementation
//!
//! Writes a starter configuration with the usual title, description and
//! status fields mapped between the two platforms.

use std::path::Path;

use colored::Colorize;

use pmsync_core::{FieldMapping, Platform, SyncConfiguration};

use crate::error::{CliError, Result};

/// Run the init command
pub fn run_init(file: &Path, source: Platform, target: Platform, force: bool) -> Result<()> {
    if file.exists() && !force {
        return Err(CliError::user(format!(
            "{} already exists (use --force to overwrite)",
            file.display()
        )));
    }

    let config = starter_config(source, target)?;
    config.save(file)?;

    println!(
        "{} Wrote {} ({} -> {}, {} field mappings)",
        "OK".green().bold(),
        file.display().to_string().cyan(),
        source,
        target,
        config.field_mappings().len()
    );
    println!();
    println!(
        "Run {} to check it.",
        format!("pmsync validate --config {}", file.display()).cyan()
    );

    Ok(())
}

/// A one-way, source-wins configuration named `<source>-to-<target>`.
pub fn starter_config(source: Platform, target: Platform) -> Result<SyncConfiguration> {
    let mappings = vec![
        FieldMapping::new(title_field(source), title_field(target))?.required(),
        FieldMapping::new(body_field(source), body_field(target))?,
        FieldMapping::new(status_field(source), status_field(target))?
            .with_transform("lowercase")
            .one_way(),
    ];

    Ok(SyncConfiguration::new(
        format!("{}-to-{}", source, target),
        source,
        target,
        mappings,
    )?)
}

fn title_field(platform: Platform) -> &'static str {
    match platform {
        Platform::Jira => "summary",
        Platform::Asana => "name",
        _ => "title",
    }
}

fn body_field(platform: Platform) -> &'static str {
    match platform {
        Platform::Github => "body",
        Platform::Asana => "notes",
        _ => "description",
    }
}

fn status_field(platform: Platform) -> &'static str {
    match platform {
        Platform::Github | Platform::Gitlab => "state",
        _ => "status",
    }
}
