use crate::core::models::declaration::KeyState;
use crate::core::models::outcome::Outcome;

/// One-line description of what reconciling a declaration did, or would do.
pub fn describe(outcome: &Outcome, dry_run: bool) -> String {
    let name = &outcome.declaration;
    let user = &outcome.user;

    if outcome.in_sync() {
        return format!("{name} ({user}): {}", outcome.target);
    }

    let (verb, past) = match outcome.target {
        KeyState::Present => ("add", "added"),
        KeyState::Absent => ("remove", "removed"),
        KeyState::SpecifiedOnly => ("purge", "purged"),
        KeyState::NeedsPurging => ("change", "changed"),
    };

    let what = if outcome.target == KeyState::SpecifiedOnly {
        format!(
            "{} unlisted key(s) for {user}: {}",
            outcome.purged.len(),
            outcome.purged.join(", ")
        )
    } else {
        format!("key '{name}' for {user}")
    };

    if dry_run {
        format!("would {verb} {what}")
    } else {
        format!("{past} {what}")
    }
}
