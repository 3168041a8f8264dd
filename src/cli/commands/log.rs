use std::path::Path;

use colored::Colorize;

use crate::adapters::audit::json_audit_logger::JsonAuditLogger;
use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::{AuthkeysError, Result};
use crate::core::models::audit_entry::{AuditAction, AuditEntry};
use crate::core::traits::audit::AuditLogger;

/// Execute the `authkeys log` command.
///
/// Displays the audit log with optional filters for account and entry count.
pub fn execute(manifest: &Path, user: Option<&str>, last: Option<usize>) -> Result<()> {
    let ctx = Context::load(manifest)?;
    let logger: JsonAuditLogger =
        ctx.audit_logger().ok_or_else(|| AuthkeysError::InvalidManifest {
            detail: "auditing is disabled; set 'audit_log' under [settings]".into(),
        })?;

    let entries = logger.query(user)?;

    if entries.is_empty() {
        output::header("authkeys log");
        output::warning("No audit entries found");
        if user.is_some() {
            println!("  Try removing filters to see all entries.");
        }
        return Ok(());
    }

    let skip = last.map_or(0, |n| entries.len().saturating_sub(n));
    let display = &entries[skip..];

    output::header(&format!("authkeys log ({} entries)", display.len()));
    println!();

    for entry in display {
        print_entry(entry);
    }

    Ok(())
}

/// Print a single audit entry as a formatted row.
fn print_entry(entry: &AuditEntry) {
    let date = entry.timestamp.format("%Y-%m-%d %H:%M:%S");
    let detail = entry.detail.as_deref().unwrap_or("").dimmed().to_string();

    println!(
        "  {} {} {:<10} {} {} {}",
        date.to_string().dimmed(),
        "│".dimmed(),
        format_action(&entry.action),
        entry.user,
        entry.declaration,
        detail,
    );
}

/// Format an AuditAction as a colored string.
fn format_action(action: &AuditAction) -> String {
    match action {
        AuditAction::KeyAdd => "key add".green().to_string(),
        AuditAction::KeyRemove => "key rm".red().to_string(),
        AuditAction::KeysPurge => "purge".yellow().to_string(),
    }
}
