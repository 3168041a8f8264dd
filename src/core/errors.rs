use std::path::PathBuf;

/// All domain errors for authkeys.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum AuthkeysError {
    #[error(
        "Invalid target state '{state}'\n\n  \
         Only 'present', 'absent' and 'specified_only' can be applied.\n  \
         'needs_purging' is reported by detection and is never a target."
    )]
    InvalidTargetState { state: String },

    #[error(
        "User '{user}' not found in the account database\n\n  \
         Check the 'user' field of the declaration and that the account exists."
    )]
    AccountNotFound { user: String },

    #[error(
        "Could not create a temporary file in {dir} after {attempts} attempts\n\n  \
         Every generated name already existed. Remove stale temporary files\n  \
         next to authorized_keys and try again."
    )]
    TempFileExhausted { dir: PathBuf, attempts: u32 },

    #[error(
        "Manifest not found: {path}\n\n  \
         Pass --manifest <path> or set AUTHKEYS_MANIFEST."
    )]
    ManifestNotFound { path: PathBuf },

    #[error("Invalid manifest: {detail}")]
    InvalidManifest { detail: String },

    #[error(
        "{count} declaration(s) out of sync\n\n  \
         Run 'authkeys apply' to reconcile them."
    )]
    DriftDetected { count: usize },

    #[error("{failed} of {total} declaration(s) could not be reconciled")]
    ApplyFailed { failed: usize, total: usize },

    #[error("Audit log error: {detail}")]
    AuditError { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<nix::errno::Errno> for AuthkeysError {
    fn from(errno: nix::errno::Errno) -> Self {
        AuthkeysError::Io(std::io::Error::from(errno))
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuthkeysError>;
