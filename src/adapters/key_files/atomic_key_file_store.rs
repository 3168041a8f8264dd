use std::ffi::OsString;
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, ErrorKind, Write};
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::adapters::parsers::authorized_keys_parser::AuthorizedKeysParser;
use crate::core::errors::{AuthkeysError, Result};
use crate::core::models::key_record::KeyRecord;
use crate::core::traits::account_directory::AccountDirectory;
use crate::core::traits::key_file_store::KeyFileStore;
use crate::core::traits::parser::KeyFileParser;

/// Mode given to a key file that did not exist before.
const NEW_FILE_MODE: u32 = 0o440;

/// Mode of the temporary file while it is being written.
const TEMP_FILE_MODE: u32 = 0o600;

/// How many temporary names to try before giving up.
const MAX_TEMP_ATTEMPTS: u32 = 16;

/// Key file store that never modifies a key file in place.
///
/// A rewrite goes to a fresh temporary file in the same directory, which
/// then takes over the mode and ownership of the current file (or gets
/// `0440` and the owning account's uid/gid for a new one). The current
/// file is renamed to `<path>~` and the temporary file renamed onto
/// `<path>`.
///
/// The two renames are not atomic as a pair: a crash between them leaves
/// only the `~` backup behind. If the second rename fails with an error,
/// the backup is moved back. Readers never see a partially written file.
///
/// Files that are not valid UTF-8 are refused rather than rewritten, so
/// lines the caller never touched keep their exact bytes.
pub struct AtomicKeyFileStore<A: AccountDirectory> {
    accounts: A,
    parser: AuthorizedKeysParser,
    temp_suffix: fn() -> String,
    install: fn(&Path, &Path) -> io::Result<()>,
}

impl<A: AccountDirectory> AtomicKeyFileStore<A> {
    pub fn new(accounts: A) -> Self {
        Self {
            accounts,
            parser: AuthorizedKeysParser,
            temp_suffix: pid_and_random_suffix,
            install: |from, to| fs::rename(from, to),
        }
    }

    /// Replace the temporary name generator.
    #[cfg(test)]
    fn with_temp_suffix(mut self, temp_suffix: fn() -> String) -> Self {
        self.temp_suffix = temp_suffix;
        self
    }

    /// Replace the final rename of the temporary file onto the key file.
    #[cfg(test)]
    fn with_install(mut self, install: fn(&Path, &Path) -> io::Result<()>) -> Self {
        self.install = install;
        self
    }

    /// Exclusively create a temporary file next to `path`.
    ///
    /// Name collisions are retried with a new suffix, up to
    /// `MAX_TEMP_ATTEMPTS` times.
    fn create_temp_file(&self, path: &Path) -> Result<(PathBuf, File)> {
        for _ in 0..MAX_TEMP_ATTEMPTS {
            let candidate = with_suffix(path, &format!(".{}", (self.temp_suffix)()));

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(TEMP_FILE_MODE)
                .open(&candidate)
            {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!(path = %candidate.display(), "temporary name taken, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AuthkeysError::TempFileExhausted {
            dir: parent_dir(path).to_path_buf(),
            attempts: MAX_TEMP_ATTEMPTS,
        })
    }

    /// Mode, uid and gid the rewritten file should carry.
    fn target_attributes(&self, path: &Path, owner: &str) -> Result<(u32, u32, u32)> {
        match fs::metadata(path) {
            Ok(meta) => Ok((meta.mode() & 0o7777, meta.uid(), meta.gid())),
            Err(e) if is_missing(&e) => {
                let account = self.accounts.lookup(owner)?;
                debug!(owner = %account.name, uid = account.uid, "new key file");
                Ok((NEW_FILE_MODE, account.uid, account.gid))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_temp(
        &self,
        file: &mut File,
        tmp: &Path,
        path: &Path,
        records: &[KeyRecord],
        owner: &str,
    ) -> Result<()> {
        file.write_all(self.parser.serialize(records).as_bytes())?;
        file.flush()?;
        file.sync_all()?;

        let (mode, uid, gid) = self.target_attributes(path, owner)?;
        fs::set_permissions(tmp, Permissions::from_mode(mode))?;
        std::os::unix::fs::chown(tmp, Some(uid), Some(gid))?;
        Ok(())
    }
}

impl<A: AccountDirectory> KeyFileStore for AtomicKeyFileStore<A> {
    fn read_all(&self, path: &Path) -> Result<Vec<KeyRecord>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if is_missing(&e) => {
                debug!(path = %path.display(), "no key file, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let content = String::from_utf8(bytes).map_err(|e| {
            io::Error::new(
                ErrorKind::InvalidData,
                format!("{} is not valid UTF-8: {e}", path.display()),
            )
        })?;

        let records = self.parser.parse(&content);
        debug!(path = %path.display(), records = records.len(), "read key file");
        Ok(records)
    }

    fn replace(&self, path: &Path, records: &[KeyRecord], owner: &str) -> Result<()> {
        fs::create_dir_all(parent_dir(path))?;

        let (tmp, mut file) = self.create_temp_file(path)?;
        let written = self.write_temp(&mut file, &tmp, path, records, owner);
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        let backup = with_suffix(path, "~");
        let backed_up = match fs::rename(path, &backup) {
            Ok(()) => {
                debug!(backup = %backup.display(), "previous key file kept as backup");
                true
            }
            Err(e) if is_missing(&e) => false,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
        };

        // Between the two renames the key file does not exist.
        if let Err(e) = (self.install)(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            if backed_up && let Err(restore) = fs::rename(&backup, path) {
                warn!(
                    backup = %backup.display(),
                    error = %restore,
                    "could not restore previous key file"
                );
            }
            return Err(e.into());
        }
        debug!(path = %path.display(), records = records.len(), "key file replaced");
        Ok(())
    }
}

fn pid_and_random_suffix() -> String {
    format!("{}.{}", std::process::id(), rand::random::<u64>())
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn is_missing(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}
