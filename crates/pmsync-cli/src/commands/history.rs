//! History command implementation

use std::path::Path;

use colored::Colorize;

use pmsync_core::{AuditEntry, SyncAuditor, SyncStatus};

use crate::error::Result;

/// Run the history command
///
/// Lists audit entries for `item_id` over the last `days` days, oldest first.
pub fn run_history(audit_dir: &Path, item_id: &str, days: u32, json: bool) -> Result<()> {
    let entries = SyncAuditor::new(audit_dir).get_sync_history(item_id, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!(
            "No sync history for {} in the last {} day(s).",
            item_id.cyan(),
            days.max(1)
        );
        return Ok(());
    }

    println!(
        "{} History of {} ({} entries)",
        "=>".blue().bold(),
        item_id.cyan(),
        entries.len()
    );
    for entry in &entries {
        println!("   {}", describe(entry));
    }

    Ok(())
}

fn describe(entry: &AuditEntry) -> String {
    let result = &entry.result;
    let status = match result.status {
        SyncStatus::Completed => result.status.to_string().green(),
        SyncStatus::Skipped => result.status.to_string().dimmed(),
        SyncStatus::Conflict => result.status.to_string().yellow(),
        SyncStatus::Failed => result.status.to_string().red(),
    };

    let mut line = format!(
        "{} {} {} -> {}",
        entry.logged_at.format("%Y-%m-%d %H:%M:%S"),
        status,
        result.source_platform,
        result.target_platform
    );
    if !result.changes.is_empty() {
        let fields: Vec<&str> = result.changes.keys().map(String::as_str).collect();
        line.push_str(&format!(" [{}]", fields.join(", ")));
    }
    if let Some(detail) = result.error.as_ref().or(result.resolution.as_ref()) {
        line.push_str(&format!(": {}", detail));
    }
    line
}
