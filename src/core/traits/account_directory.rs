use crate::core::errors::Result;
use crate::core::models::account::Account;

/// Port for resolving user names against the system account database.
pub trait AccountDirectory: Send + Sync {
    /// Look up `user`, failing with `AccountNotFound` if it does not exist.
    fn lookup(&self, user: &str) -> Result<Account>;
}
