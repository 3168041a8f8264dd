use crate::core::models::declaration::KeyState;

/// Result of reconciling one declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub declaration: String,
    pub user: String,
    /// State detected before any change was made.
    pub before: KeyState,
    pub target: KeyState,
    /// True when the detected state differed from the target. In a dry run
    /// this means a change would have been made.
    pub changed: bool,
    /// Labels of records a purge removed (or would remove).
    pub purged: Vec<String>,
}

impl Outcome {
    pub fn in_sync(&self) -> bool {
        !self.changed
    }
}
