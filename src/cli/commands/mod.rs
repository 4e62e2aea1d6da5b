pub mod apply;
pub mod init;
pub mod journal_helpers;
pub mod keys;
pub mod log;
pub mod patch;
pub mod plan;
