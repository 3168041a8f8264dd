use crate::core::models::key_record::KeyRecord;
use crate::core::traits::parser::KeyFileParser;

/// Lines shorter than this (terminator included) are treated as noise.
const MIN_LINE_LEN: usize = 10;

/// Parses and serializes OpenSSH `authorized_keys` files.
///
/// - `[options] type key [comment]` entries
/// - Lines starting with `#` are skipped
/// - Lines under ten characters are skipped
/// - Entries without a recognized key type or key material are dropped
///
/// Skipped and dropped lines are not preserved on serialization.
pub struct AuthorizedKeysParser;

impl AuthorizedKeysParser {
    /// Parse one raw line (terminator included) into a record worth keeping.
    fn parse_line(raw: &str) -> Option<KeyRecord> {
        if raw.starts_with('#') || raw.chars().count() < MIN_LINE_LEN {
            return None;
        }

        let line = raw
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(raw);

        let record = KeyRecord::parse(line);
        record.is_valid().then_some(record)
    }
}

impl KeyFileParser for AuthorizedKeysParser {
    fn parse(&self, content: &str) -> Vec<KeyRecord> {
        content
            .split_inclusive('\n')
            .filter_map(AuthorizedKeysParser::parse_line)
            .collect()
    }

    fn serialize(&self, records: &[KeyRecord]) -> String {
        let mut output = records
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        output.push('\n');
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_and_short_lines() {
        let parser = AuthorizedKeysParser;
        let content = "# header\nshort\nssh-rsa AAAAB3NzaC1 bob\n";
        let records = parser.parse(content);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "AAAAB3NzaC1");
        assert_eq!(records[0].comment.as_deref(), Some("bob"));
    }

    #[test]
    fn parse_drops_invalid_entries() {
        let parser = AuthorizedKeysParser;
        let content = "ssh-ed25519 AAAAC3NzaC1 alice\n\
                       no-pty ssh-rsa\n\
                       ssh-dss AAAAB3NzaC1kc3 carol\n";
        let records = parser.parse(content);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key_type, "ssh-dss");
    }

    #[test]
    fn parse_counts_terminator_in_line_length() {
        let parser = AuthorizedKeysParser;
        // nine visible characters plus the newline reach the threshold
        let records = parser.parse("ssh-rsa K\n");
        assert_eq!(records.len(), 1);

        // without a terminator the same line is too short
        assert!(parser.parse("ssh-rsa K").is_empty());
    }

    #[test]
    fn parse_handles_crlf_and_missing_final_newline() {
        let parser = AuthorizedKeysParser;
        let content = "ssh-rsa AAAA first\r\nssh-rsa BBBB second";
        let records = parser.parse(content);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].comment.as_deref(), Some("first"));
        assert_eq!(records[1].comment.as_deref(), Some("second"));
    }

    #[test]
    fn parse_empty_content() {
        assert!(AuthorizedKeysParser.parse("").is_empty());
    }

    #[test]
    fn indented_comment_is_not_a_comment() {
        let parser = AuthorizedKeysParser;
        // only a leading '#' marks a comment; this becomes options
        let records = parser.parse("  # ssh-rsa AAAA note\n");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].options.as_deref(), Some("#"));
    }

    #[test]
    fn serialize_one_record_per_line() {
        let parser = AuthorizedKeysParser;
        let records = vec![
            KeyRecord::new("ssh-rsa", "AAAA").with_comment("bob"),
            KeyRecord::new("ssh-dss", "BBBB")
                .with_comment("carol")
                .with_options("no-pty"),
        ];

        assert_eq!(
            parser.serialize(&records),
            "ssh-rsa AAAA bob\nno-pty ssh-dss BBBB carol\n"
        );
    }

    #[test]
    fn serialize_empty_list_is_single_newline() {
        assert_eq!(AuthorizedKeysParser.serialize(&[]), "\n");
    }

    #[test]
    fn round_trip_preserves_entries() {
        let parser = AuthorizedKeysParser;
        let original = "ssh-rsa AAAA bob\ncommand=\"uptime\" ssh-rsa BBBB ops team\n";
        let records = parser.parse(original);

        assert_eq!(parser.serialize(&records), original);
    }
}
