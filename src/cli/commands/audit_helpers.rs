use chrono::Utc;
use tracing::warn;

use crate::adapters::audit::json_audit_logger::JsonAuditLogger;
use crate::cli::output;
use crate::core::models::audit_entry::{AuditAction, AuditEntry};
use crate::core::models::declaration::KeyState;
use crate::core::models::outcome::Outcome;
use crate::core::traits::audit::AuditLogger;

/// Audit action matching the state a declaration was moved to.
pub fn action_for(target: KeyState) -> Option<AuditAction> {
    match target {
        KeyState::Present => Some(AuditAction::KeyAdd),
        KeyState::Absent => Some(AuditAction::KeyRemove),
        KeyState::SpecifiedOnly => Some(AuditAction::KeysPurge),
        KeyState::NeedsPurging => None,
    }
}

/// Record an applied change. Warns on failure instead of propagating
/// the error, since audit should not block reconciliation.
pub fn log_outcome(logger: Option<&JsonAuditLogger>, outcome: &Outcome) {
    let Some(logger) = logger else {
        return;
    };
    let Some(action) = action_for(outcome.target) else {
        return;
    };

    let detail = if outcome.purged.is_empty() {
        format!("{} -> {}", outcome.before, outcome.target)
    } else {
        format!("purged {}", outcome.purged.join(", "))
    };

    let entry = AuditEntry {
        timestamp: Utc::now(),
        action,
        user: outcome.user.clone(),
        declaration: outcome.declaration.clone(),
        detail: Some(detail),
    };

    if let Err(e) = logger.log_event(&entry) {
        warn!(error = %e, "audit log write failed");
        output::warning(&format!("Could not write audit log: {e}"));
    }
}
