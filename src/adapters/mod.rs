pub mod files;
pub mod journal;
pub mod key_sources;
pub mod key_stores;
pub mod system;
