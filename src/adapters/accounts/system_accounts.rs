use nix::unistd::User;

use crate::core::errors::{AuthkeysError, Result};
use crate::core::models::account::Account;
use crate::core::traits::account_directory::AccountDirectory;

/// Account directory backed by the system passwd database (`getpwnam`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAccounts;

impl AccountDirectory for SystemAccounts {
    fn lookup(&self, user: &str) -> Result<Account> {
        let found = User::from_name(user)?.ok_or_else(|| AuthkeysError::AccountNotFound {
            user: user.to_string(),
        })?;

        Ok(Account {
            name: found.name,
            uid: found.uid.as_raw(),
            gid: found.gid.as_raw(),
            home: found.dir,
        })
    }
}
