pub mod account_directory;
pub mod audit;
pub mod key_file_store;
pub mod parser;
