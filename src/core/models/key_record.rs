use std::fmt;

/// Key algorithm tokens that mark the start of the `type key [comment]`
/// part of an authorized_keys line. Anything before them is options.
pub const RECOGNIZED_KEY_TYPES: [&str; 5] = [
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "ssh-dss",
    "ssh-rsa",
];

/// Returns true if `token` is one of the recognized key algorithm names.
pub fn is_recognized_key_type(token: &str) -> bool {
    RECOGNIZED_KEY_TYPES.contains(&token)
}

/// One entry of an `authorized_keys` file.
///
/// Grammar: `[options] type key [comment]`. The options blob is kept
/// verbatim and never interpreted.
///
/// Two records are equal when their `key_type` and `key` match. Options
/// and comment do not take part in equality, since sshd only ever
/// examines the first entry carrying a given piece of key material.
#[derive(Debug, Clone, Default)]
pub struct KeyRecord {
    pub options: Option<String>,
    pub key_type: String,
    pub key: String,
    pub comment: Option<String>,
}

impl KeyRecord {
    /// Build a record from its type and key material. The key is trimmed.
    pub fn new(key_type: impl Into<String>, key: &str) -> Self {
        Self {
            options: None,
            key_type: key_type.into(),
            key: key.trim().to_string(),
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        let options = options.into();
        self.options = if options.is_empty() {
            None
        } else {
            Some(options)
        };
        self
    }

    /// Parse a single line (without its line terminator).
    ///
    /// Leading tokens that are not a recognized key type are absorbed into
    /// the options blob together with the whitespace that followed them.
    /// If the line runs out before a key type shows up, the result has no
    /// key and is therefore invalid.
    pub fn parse(line: &str) -> Self {
        let mut options = String::new();
        let (mut token, mut tail) = split_first_whitespace(line);

        while !is_recognized_key_type(token) {
            let Some((ws, rest)) = tail else {
                break;
            };
            options.push_str(token);
            options.push_str(ws);
            (token, tail) = split_first_whitespace(rest);
        }

        let options = options.trim();
        let mut record = KeyRecord {
            options: (!options.is_empty()).then(|| options.to_string()),
            key_type: token.to_string(),
            key: String::new(),
            comment: None,
        };

        if let Some((_, rest)) = tail
            && !rest.is_empty()
        {
            match split_first_whitespace(rest) {
                (key, Some((_, comment))) => {
                    record.key = key.to_string();
                    record.comment = Some(comment.to_string());
                }
                (key, None) => record.key = key.to_string(),
            }
        }

        record
    }

    /// A record is usable only when it carries both a type and key material.
    pub fn is_valid(&self) -> bool {
        !self.key_type.is_empty() && !self.key.is_empty()
    }

    /// Human-readable label for logs: the comment, or a shortened key.
    pub fn label(&self) -> String {
        match self.comment.as_deref() {
            Some(comment) if !comment.trim().is_empty() => comment.to_string(),
            _ => {
                let tail: String = self.key.chars().rev().take(12).collect();
                let tail: String = tail.chars().rev().collect();
                format!("{} ...{}", self.key_type, tail)
            }
        }
    }
}

impl PartialEq for KeyRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key_type == other.key_type && self.key == other.key
    }
}

impl Eq for KeyRecord {}

impl fmt::Display for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let comment = self.comment.as_deref().unwrap_or("");
        match &self.options {
            Some(options) => write!(
                f,
                "{} {} {} {}",
                options, self.key_type, self.key, comment
            ),
            None => write!(f, "{} {} {}", self.key_type, self.key, comment),
        }
    }
}

fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c')
}

/// Split `s` at its first whitespace run.
///
/// Returns the leading token and, if a whitespace run was found, the run
/// itself plus everything after it.
fn split_first_whitespace(s: &str) -> (&str, Option<(&str, &str)>) {
    let Some(start) = s.find(is_separator) else {
        return (s, None);
    };
    let after = &s[start..];
    let run_len = after
        .find(|c: char| !is_separator(c))
        .unwrap_or(after.len());
    (&s[..start], Some((&after[..run_len], &after[run_len..])))
}
