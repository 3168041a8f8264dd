use std::path::Path;

use crate::core::errors::Result;
use crate::core::models::key_record::KeyRecord;

/// Port for loading and replacing a user's authorized_keys file.
pub trait KeyFileStore: Send + Sync {
    /// Read every valid record. A missing file (or directory) is an empty list.
    fn read_all(&self, path: &Path) -> Result<Vec<KeyRecord>>;

    /// Replace the whole file with `records`.
    ///
    /// `owner` names the account that owns a newly created file; an
    /// existing file keeps its own mode and ownership.
    fn replace(&self, path: &Path, records: &[KeyRecord], owner: &str) -> Result<()>;
}
