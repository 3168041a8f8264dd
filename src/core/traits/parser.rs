use crate::core::models::key_record::KeyRecord;

/// Port for reading and writing the body of a key file.
///
/// Parsing never fails: lines that do not form a usable record are
/// dropped, since a half-broken authorized_keys file must still be
/// reconcilable.
pub trait KeyFileParser: Send + Sync {
    /// Parse raw file content into its valid records, in file order.
    fn parse(&self, content: &str) -> Vec<KeyRecord>;

    /// Serialize records back to a complete file body.
    fn serialize(&self, records: &[KeyRecord]) -> String;
}
