use std::collections::HashMap;
use std::path::Path;

use nix::unistd::{getgid, getuid};

use crate::core::errors::{AuthkeysError, Result};
use crate::core::models::account::Account;
use crate::core::traits::account_directory::AccountDirectory;

/// In-memory account directory for tests.
///
/// Every account it knows is owned by the uid/gid of the running process,
/// so files can be chowned to it without privileges.
#[derive(Debug, Clone, Default)]
pub struct StaticAccounts {
    accounts: HashMap<String, Account>,
}

impl StaticAccounts {
    /// Register `name` with its home directory under `home_root`.
    pub fn with_user(mut self, name: &str, home_root: &Path) -> Self {
        self.accounts.insert(
            name.to_string(),
            Account {
                name: name.to_string(),
                uid: getuid().as_raw(),
                gid: getgid().as_raw(),
                home: home_root.join(name),
            },
        );
        self
    }
}

impl AccountDirectory for StaticAccounts {
    fn lookup(&self, user: &str) -> Result<Account> {
        self.accounts
            .get(user)
            .cloned()
            .ok_or_else(|| AuthkeysError::AccountNotFound {
                user: user.to_string(),
            })
    }
}
