use std::collections::HashMap;

use crate::core::models::declaration::Declaration;
use crate::core::models::key_record::KeyRecord;

/// Every key declared for each user, across all declarations.
///
/// Purge mode needs to know about sibling declarations for the same user,
/// so the registry is built from the complete declaration list before any
/// reconciliation starts. Keys declared `absent` are included too: they
/// are managed, and their own declaration takes care of removing them.
#[derive(Debug, Clone, Default)]
pub struct DesiredKeyRegistry {
    by_user: HashMap<String, Vec<KeyRecord>>,
}

impl DesiredKeyRegistry {
    pub fn from_declarations<'a>(declarations: impl IntoIterator<Item = &'a Declaration>) -> Self {
        let mut by_user: HashMap<String, Vec<KeyRecord>> = HashMap::new();

        for decl in declarations {
            if let Some(record) = decl.as_key_record() {
                by_user.entry(decl.user.clone()).or_default().push(record);
            }
        }

        Self { by_user }
    }

    /// All declared records for `user`, in declaration order.
    pub fn desired_keys_for(&self, user: &str) -> &[KeyRecord] {
        self.by_user.get(user).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `record` is declared for `user`.
    pub fn is_declared(&self, user: &str, record: &KeyRecord) -> bool {
        self.desired_keys_for(user).contains(record)
    }
}
