pub mod accounts;
pub mod command_runner;
