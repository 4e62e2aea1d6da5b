pub mod account_directory;
pub mod command_runner;
pub mod config_files;
pub mod journal;
pub mod key_source;
pub mod key_store;
