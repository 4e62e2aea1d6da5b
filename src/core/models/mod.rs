pub mod account;
pub mod authorized_key_store;
pub mod directive;
pub mod journal_entry;
pub mod key_record;
