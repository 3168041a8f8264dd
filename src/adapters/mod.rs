pub mod accounts;
pub mod audit;
pub mod key_files;
pub mod parsers;
