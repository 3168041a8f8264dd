use std::path::PathBuf;

use tracing::info;

use crate::core::errors::{AuthkeysError, Result};
use crate::core::models::declaration::{Declaration, KeyState};
use crate::core::models::key_record::KeyRecord;
use crate::core::models::outcome::Outcome;
use crate::core::services::desired_key_registry::DesiredKeyRegistry;
use crate::core::traits::account_directory::AccountDirectory;
use crate::core::traits::key_file_store::KeyFileStore;

/// Key file location used when the manifest does not set one.
pub const DEFAULT_KEY_FILE: &str = "%h/.ssh/authorized_keys";

/// Detects and applies the state of key declarations.
///
/// Holds no state between calls other than the registry, which the caller
/// builds from the full declaration list before the first pass.
pub struct ReconcileService<S: KeyFileStore, A: AccountDirectory> {
    pub store: S,
    pub accounts: A,
    pub registry: DesiredKeyRegistry,
    /// Path template: `%h` is the user's home, `%u` the user name.
    pub key_file: String,
}

impl<S: KeyFileStore, A: AccountDirectory> ReconcileService<S, A> {
    /// Resolve the authorized_keys path for `user`.
    ///
    /// The account database is only consulted when the template uses `%h`.
    pub fn key_file_path(&self, user: &str) -> Result<PathBuf> {
        let home = if self.key_file.contains("%h") {
            Some(self.accounts.lookup(user)?.home)
        } else {
            None
        };

        let mut expanded = String::with_capacity(self.key_file.len());
        let mut chars = self.key_file.chars();
        while let Some(c) = chars.next() {
            if c != '%' {
                expanded.push(c);
                continue;
            }
            match chars.next() {
                Some('h') => {
                    if let Some(home) = &home {
                        expanded.push_str(&home.to_string_lossy());
                    }
                }
                Some('u') => expanded.push_str(user),
                Some('%') => expanded.push('%'),
                Some(other) => {
                    expanded.push('%');
                    expanded.push(other);
                }
                None => expanded.push('%'),
            }
        }

        Ok(PathBuf::from(expanded))
    }

    /// The current keys in `user`'s file.
    pub fn list_keys(&self, user: &str) -> Result<Vec<KeyRecord>> {
        self.store.read_all(&self.key_file_path(user)?)
    }

    /// Records in `user`'s file that no declaration asks for.
    pub fn extraneous_keys(&self, user: &str) -> Result<Vec<KeyRecord>> {
        let mut keys = self.list_keys(user)?;
        keys.retain(|k| !self.registry.is_declared(user, k));
        Ok(keys)
    }

    /// Current state of `decl` relative to the key file.
    ///
    /// A purge declaration reports `specified_only` when every record in the
    /// file is declared for the user, and `needs_purging` otherwise. Any
    /// other declaration reports `present` if its key is in the file.
    pub fn detect_state(&self, decl: &Declaration) -> Result<KeyState> {
        self.detect(decl).map(|(state, _)| state)
    }

    /// Detected state plus the records a purge would remove.
    fn detect(&self, decl: &Declaration) -> Result<(KeyState, Vec<KeyRecord>)> {
        if decl.ensure == KeyState::SpecifiedOnly {
            let extraneous = self.extraneous_keys(&decl.user)?;
            for key in &extraneous {
                info!(user = %decl.user, key = %key.label(), "key scheduled for purge");
            }
            let state = if extraneous.is_empty() {
                KeyState::SpecifiedOnly
            } else {
                KeyState::NeedsPurging
            };
            return Ok((state, extraneous));
        }

        let record = declared_record(decl, decl.ensure)?;
        let keys = self.list_keys(&decl.user)?;
        let state = if keys.contains(&record) {
            KeyState::Present
        } else {
            KeyState::Absent
        };
        Ok((state, Vec::new()))
    }

    /// Rewrite the key file so that `decl` reaches `target`.
    ///
    /// - `absent` removes every record equal to the declared key
    /// - `present` appends the declared key, even if an equal one exists
    /// - `specified_only` keeps only records declared for the user and
    ///   never adds missing ones
    ///
    /// `needs_purging` is a detection result and is rejected.
    pub fn apply_state(&self, decl: &Declaration, target: KeyState) -> Result<()> {
        let path = self.key_file_path(&decl.user)?;

        let keys = match target {
            KeyState::Absent => {
                let record = declared_record(decl, target)?;
                let mut keys = self.store.read_all(&path)?;
                keys.retain(|k| *k != record);
                keys
            }
            KeyState::Present => {
                let record = declared_record(decl, target)?;
                let mut keys = self.store.read_all(&path)?;
                keys.push(record);
                keys
            }
            KeyState::SpecifiedOnly => {
                let desired = self.registry.desired_keys_for(&decl.user);
                let mut keys = self.store.read_all(&path)?;
                keys.retain(|k| desired.contains(k));
                keys
            }
            KeyState::NeedsPurging => {
                return Err(AuthkeysError::InvalidTargetState {
                    state: target.to_string(),
                });
            }
        };

        self.store.replace(&path, &keys, &decl.user)
    }

    /// Detect the state of `decl` and, unless `dry_run`, apply its declared
    /// state when the two differ.
    pub fn reconcile(&self, decl: &Declaration, dry_run: bool) -> Result<Outcome> {
        let target = decl.ensure;
        let (before, extraneous) = self.detect(decl)?;
        let changed = before != target;
        let purged = extraneous.iter().map(KeyRecord::label).collect();

        if changed && !dry_run {
            self.apply_state(decl, target)?;
            info!(
                declaration = %decl.name,
                user = %decl.user,
                from = %before,
                to = %target,
                "key file updated"
            );
        }

        Ok(Outcome {
            declaration: decl.name.clone(),
            user: decl.user.clone(),
            before,
            target,
            changed,
            purged,
        })
    }
}

/// The record a declaration manages when driven towards `target`.
fn declared_record(decl: &Declaration, target: KeyState) -> Result<KeyRecord> {
    decl.as_key_record()
        .ok_or_else(|| AuthkeysError::InvalidTargetState {
            state: format!(
                "{target} (declaration '{}' is {} and has no key of its own)",
                decl.name, decl.ensure
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::accounts::static_accounts::StaticAccounts;
    use crate::adapters::key_files::atomic_key_file_store::AtomicKeyFileStore;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Engine = ReconcileService<AtomicKeyFileStore<StaticAccounts>, StaticAccounts>;

    fn engine(root: &Path, declarations: &[Declaration]) -> Engine {
        let accounts = StaticAccounts::default()
            .with_user("bob", root)
            .with_user("alice", root);
        ReconcileService {
            store: AtomicKeyFileStore::new(accounts.clone()),
            accounts,
            registry: DesiredKeyRegistry::from_declarations(declarations),
            key_file: DEFAULT_KEY_FILE.to_string(),
        }
    }

    fn key(name: &str, key: &str, ensure: KeyState) -> Declaration {
        Declaration {
            name: name.into(),
            user: "bob".into(),
            key_type: Some("ssh-rsa".into()),
            key: Some(key.into()),
            options: vec![],
            ensure,
        }
    }

    fn purge() -> Declaration {
        Declaration {
            name: "bob-only".into(),
            user: "bob".into(),
            key_type: None,
            key: None,
            options: vec![],
            ensure: KeyState::SpecifiedOnly,
        }
    }

    fn key_file(root: &Path) -> std::path::PathBuf {
        root.join("bob/.ssh/authorized_keys")
    }

    fn write_keys(root: &Path, content: &str) {
        let path = key_file(root);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Store wrapper that counts reads.
    struct CountingStore {
        inner: AtomicKeyFileStore<StaticAccounts>,
        reads: AtomicUsize,
    }

    impl KeyFileStore for CountingStore {
        fn read_all(&self, path: &Path) -> Result<Vec<KeyRecord>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read_all(path)
        }

        fn replace(&self, path: &Path, records: &[KeyRecord], owner: &str) -> Result<()> {
            self.inner.replace(path, records, owner)
        }
    }

    fn read_keys(root: &Path) -> String {
        fs::read_to_string(key_file(root)).unwrap()
    }

    #[test]
    fn key_file_path_expands_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = engine(dir.path(), &[]);

        assert_eq!(svc.key_file_path("bob").unwrap(), key_file(dir.path()));

        svc.key_file = "/etc/ssh/keys/%u.pub%%".into();
        assert_eq!(
            svc.key_file_path("carol").unwrap(),
            PathBuf::from("/etc/ssh/keys/carol.pub%")
        );
    }

    #[test]
    fn key_file_path_for_unknown_user_fails_only_with_home_token() {
        let dir = tempfile::tempdir().unwrap();
        let mut svc = engine(dir.path(), &[]);

        assert!(matches!(
            svc.key_file_path("mallory"),
            Err(AuthkeysError::AccountNotFound { .. })
        ));

        svc.key_file = "/srv/keys/%u".into();
        assert!(svc.key_file_path("mallory").is_ok());
    }

    #[test]
    fn missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let decl = key("bob", "AAAA", KeyState::Present);
        let svc = engine(dir.path(), &[decl.clone()]);

        assert_eq!(svc.detect_state(&decl).unwrap(), KeyState::Absent);
    }

    #[test]
    fn missing_file_satisfies_purge() {
        let dir = tempfile::tempdir().unwrap();
        let svc = engine(dir.path(), &[purge()]);

        assert_eq!(svc.detect_state(&purge()).unwrap(), KeyState::SpecifiedOnly);
    }

    #[test]
    fn detect_matches_on_type_and_key_only() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(dir.path(), "no-pty ssh-rsa AAAA someone-else\n");
        let decl = key("bob", "AAAA", KeyState::Absent);
        let svc = engine(dir.path(), &[decl.clone()]);

        assert_eq!(svc.detect_state(&decl).unwrap(), KeyState::Present);
    }

    #[test]
    fn apply_present_on_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(dir.path(), "");
        let decl = key("bob", "AAAA", KeyState::Present);
        let svc = engine(dir.path(), &[decl.clone()]);

        svc.apply_state(&decl, KeyState::Present).unwrap();

        assert_eq!(read_keys(dir.path()), "ssh-rsa AAAA bob\n");
        assert_eq!(svc.detect_state(&decl).unwrap(), KeyState::Present);
    }

    #[test]
    fn apply_present_writes_options() {
        let dir = tempfile::tempdir().unwrap();
        let mut decl = key("bob", "AAAA", KeyState::Present);
        decl.options = vec!["no-pty".into(), "no-port-forwarding".into()];
        let svc = engine(dir.path(), &[decl.clone()]);

        svc.apply_state(&decl, KeyState::Present).unwrap();

        assert_eq!(
            read_keys(dir.path()),
            "no-pty,no-port-forwarding ssh-rsa AAAA bob\n"
        );
    }

    #[test]
    fn apply_absent_removes_every_match() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(
            dir.path(),
            "ssh-rsa AAAA bob\nssh-rsa BBBB alice\nfrom=\"10.0.0.1\" ssh-rsa AAAA copy\n",
        );
        let decl = key("bob", "AAAA", KeyState::Absent);
        let svc = engine(dir.path(), &[decl.clone()]);

        svc.apply_state(&decl, KeyState::Absent).unwrap();

        assert_eq!(read_keys(dir.path()), "ssh-rsa BBBB alice\n");
        assert_eq!(svc.detect_state(&decl).unwrap(), KeyState::Absent);
    }

    #[test]
    fn apply_absent_on_missing_file_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let decl = key("bob", "AAAA", KeyState::Absent);
        let svc = engine(dir.path(), &[decl.clone()]);

        svc.apply_state(&decl, KeyState::Absent).unwrap();

        assert!(svc.list_keys("bob").unwrap().is_empty());
    }

    #[test]
    fn apply_present_twice_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(dir.path(), "ssh-rsa AAAA bob\n");
        let decl = key("bob", "AAAA", KeyState::Present);
        let svc = engine(dir.path(), &[decl.clone()]);

        svc.apply_state(&decl, KeyState::Present).unwrap();
        svc.apply_state(&decl, KeyState::Present).unwrap();

        let keys = svc.list_keys("bob").unwrap();
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|k| k.key == "AAAA"));
    }

    #[test]
    fn purge_removes_extras_without_adding() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(
            dir.path(),
            "ssh-rsa AAAA a\nssh-rsa BBBB b\nssh-rsa CCCC c\n",
        );
        let decls = vec![
            key("a", "AAAA", KeyState::Present),
            key("b", "BBBB", KeyState::Present),
            key("d", "DDDD", KeyState::Present),
            purge(),
        ];
        let svc = engine(dir.path(), &decls);

        assert_eq!(svc.detect_state(&purge()).unwrap(), KeyState::NeedsPurging);
        svc.apply_state(&purge(), KeyState::SpecifiedOnly).unwrap();

        assert_eq!(read_keys(dir.path()), "ssh-rsa AAAA a\nssh-rsa BBBB b\n");
        assert_eq!(svc.detect_state(&purge()).unwrap(), KeyState::SpecifiedOnly);
    }

    #[test]
    fn purge_ignores_other_users_declarations() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(dir.path(), "ssh-rsa AAAA a\n");
        let mut for_alice = key("a", "AAAA", KeyState::Present);
        for_alice.user = "alice".into();
        let svc = engine(dir.path(), &[for_alice, purge()]);

        assert_eq!(svc.detect_state(&purge()).unwrap(), KeyState::NeedsPurging);
        assert_eq!(svc.extraneous_keys("bob").unwrap().len(), 1);
    }

    #[test]
    fn needs_purging_is_never_a_target() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(dir.path(), "ssh-rsa AAAA a\n");
        let svc = engine(dir.path(), &[purge()]);

        let result = svc.apply_state(&purge(), KeyState::NeedsPurging);
        assert!(matches!(result, Err(AuthkeysError::InvalidTargetState { .. })));
        assert_eq!(read_keys(dir.path()), "ssh-rsa AAAA a\n");
    }

    #[test]
    fn purge_declaration_cannot_be_made_present() {
        let dir = tempfile::tempdir().unwrap();
        let svc = engine(dir.path(), &[purge()]);

        let result = svc.apply_state(&purge(), KeyState::Present);
        assert!(matches!(result, Err(AuthkeysError::InvalidTargetState { .. })));
    }

    #[test]
    fn reconcile_changes_only_when_out_of_sync() {
        let dir = tempfile::tempdir().unwrap();
        let decl = key("bob", "AAAA", KeyState::Present);
        let svc = engine(dir.path(), &[decl.clone()]);

        let first = svc.reconcile(&decl, false).unwrap();
        assert!(first.changed);
        assert_eq!(first.before, KeyState::Absent);

        let second = svc.reconcile(&decl, false).unwrap();
        assert!(second.in_sync());
        assert_eq!(svc.list_keys("bob").unwrap().len(), 1);
    }

    #[test]
    fn reconcile_dry_run_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(dir.path(), "ssh-rsa AAAA a\nssh-rsa ZZZZ stray\n");
        let decls = vec![key("a", "AAAA", KeyState::Present), purge()];
        let svc = engine(dir.path(), &decls);

        let outcome = svc.reconcile(&purge(), true).unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.before, KeyState::NeedsPurging);
        assert_eq!(outcome.purged, vec!["stray".to_string()]);
        assert_eq!(read_keys(dir.path()), "ssh-rsa AAAA a\nssh-rsa ZZZZ stray\n");
    }

    #[test]
    fn reconcile_reports_purged_keys_from_a_single_read() {
        let dir = tempfile::tempdir().unwrap();
        write_keys(dir.path(), "ssh-rsa AAAA a\nssh-rsa ZZZZ stray\n");
        let decls = vec![key("a", "AAAA", KeyState::Present), purge()];
        let accounts = StaticAccounts::default().with_user("bob", dir.path());
        let svc = ReconcileService {
            store: CountingStore {
                inner: AtomicKeyFileStore::new(accounts.clone()),
                reads: AtomicUsize::new(0),
            },
            accounts,
            registry: DesiredKeyRegistry::from_declarations(&decls),
            key_file: DEFAULT_KEY_FILE.to_string(),
        };

        let outcome = svc.reconcile(&purge(), true).unwrap();

        assert_eq!(outcome.purged, vec!["stray".to_string()]);
        assert_eq!(svc.store.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn file_that_is_not_utf8_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let original: &[u8] = b"ssh-rsa AAAA x\nssh-rsa BBBB Jos\xe9\n";
        let path = key_file(dir.path());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, original).unwrap();
        let decl = key("x", "AAAA", KeyState::Absent);
        let svc = engine(dir.path(), &[decl.clone()]);

        assert!(svc.apply_state(&decl, KeyState::Absent).is_err());

        assert_eq!(fs::read(&path).unwrap(), original);
        assert!(!path.with_file_name("authorized_keys~").exists());
    }
}
