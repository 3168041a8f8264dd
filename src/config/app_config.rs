use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::errors::{AuthkeysError, Result};
use crate::core::models::declaration::{Declaration, KeyState};
use crate::core::models::key_record::{RECOGNIZED_KEY_TYPES, is_recognized_key_type};
use crate::core::services::reconcile_service::DEFAULT_KEY_FILE;

/// Manifest file name looked up in the current directory by default.
pub const DEFAULT_MANIFEST: &str = "authkeys.toml";

/// Top-level manifest read from `authkeys.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "key")]
    pub declarations: Vec<Declaration>,
}

impl AppConfig {
    /// Load and validate the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AuthkeysError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| AuthkeysError::InvalidManifest {
            detail: format!("Failed to parse manifest: {e}"),
        })?;

        for decl in &config.declarations {
            validate_declaration(decl)?;
        }

        Ok(config)
    }
}

/// The `[settings]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Location of each user's key file. `%h` expands to the home
    /// directory, `%u` to the user name.
    #[serde(default = "default_key_file")]
    pub authorized_keys_file: String,
    /// Where to append the audit log. Auditing is off when unset.
    pub audit_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            authorized_keys_file: default_key_file(),
            audit_log: None,
        }
    }
}

fn default_key_file() -> String {
    DEFAULT_KEY_FILE.to_string()
}

/// Reject declarations that could never be reconciled.
fn validate_declaration(decl: &Declaration) -> Result<()> {
    let invalid = |detail: String| AuthkeysError::InvalidManifest {
        detail: format!("declaration '{}': {detail}", decl.name),
    };

    if decl.user.trim().is_empty() {
        return Err(invalid("'user' must not be empty".into()));
    }

    match decl.ensure {
        KeyState::Present | KeyState::Absent => {}
        KeyState::SpecifiedOnly => return Ok(()),
        KeyState::NeedsPurging => {
            return Err(AuthkeysError::InvalidTargetState {
                state: decl.ensure.to_string(),
            });
        }
    }

    let key_type = decl.key_type.as_deref().unwrap_or("");
    if !is_recognized_key_type(key_type) {
        return Err(invalid(format!(
            "unsupported key type '{key_type}', expected one of: {}",
            RECOGNIZED_KEY_TYPES.join(", ")
        )));
    }

    let key = decl.key.as_deref().unwrap_or("").trim();
    if key.is_empty() {
        return Err(invalid("'key' must not be empty".into()));
    }
    if key.contains(char::is_whitespace) {
        return Err(invalid("'key' must be a single base64 token".into()));
    }

    Ok(())
}
