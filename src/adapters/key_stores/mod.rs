pub mod authorized_keys_file;
