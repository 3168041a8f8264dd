pub mod atomic_key_file_store;
