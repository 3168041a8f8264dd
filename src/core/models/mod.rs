pub mod account;
pub mod audit_entry;
pub mod declaration;
pub mod key_record;
pub mod outcome;
