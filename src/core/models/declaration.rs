use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::core::errors::AuthkeysError;
use crate::core::models::key_record::KeyRecord;

/// States a declaration can be observed in, or asked to reach.
///
/// `SpecifiedOnly` and `NeedsPurging` only apply to purge declarations.
/// `NeedsPurging` is produced by detection and is never a legal target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyState {
    #[default]
    Present,
    Absent,
    SpecifiedOnly,
    NeedsPurging,
}

impl KeyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyState::Present => "present",
            KeyState::Absent => "absent",
            KeyState::SpecifiedOnly => "specified_only",
            KeyState::NeedsPurging => "needs_purging",
        }
    }
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyState {
    type Err = AuthkeysError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(KeyState::Present),
            "absent" => Ok(KeyState::Absent),
            "specified_only" => Ok(KeyState::SpecifiedOnly),
            "needs_purging" => Ok(KeyState::NeedsPurging),
            other => Err(AuthkeysError::InvalidTargetState {
                state: other.to_string(),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for KeyState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One desired key for one user, as written in the manifest.
///
/// A purge declaration (`ensure = "specified_only"`) carries no key
/// material of its own.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    /// Also used as the comment of the written key line.
    pub name: String,
    pub user: String,
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_options")]
    pub options: Vec<String>,
    #[serde(default)]
    pub ensure: KeyState,
}

impl Declaration {
    /// The record this declaration writes or removes.
    ///
    /// Only `present` and `absent` declarations describe a key; every other
    /// state yields `None`.
    pub fn as_key_record(&self) -> Option<KeyRecord> {
        if !matches!(self.ensure, KeyState::Present | KeyState::Absent) {
            return None;
        }

        let record = KeyRecord::new(
            self.key_type.clone().unwrap_or_default(),
            self.key.as_deref().unwrap_or(""),
        )
        .with_options(self.options.join(","))
        .with_comment(self.name.clone());

        Some(record)
    }
}

/// Accept `options` as either one string or a list of strings.
///
/// Both forms end up as an ordered list; an empty string means no options.
fn deserialize_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(list) => list,
    })
}
