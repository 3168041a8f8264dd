pub mod authorized_keys_parser;
