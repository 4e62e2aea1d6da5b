use std::path::Path;

use crate::core::errors::ProvisionError;
use crate::core::models::key_record::KeyRecord;

/// Port for the local file that grants SSH access.
pub trait KeyStore: Send + Sync {
    /// Keys currently installed. Missing store means no keys.
    fn list(&self) -> Result<Vec<KeyRecord>, ProvisionError>;

    /// Atomically replace the store contents with exactly `keys`.
    fn replace_all(&self, keys: &[KeyRecord]) -> Result<(), ProvisionError>;

    /// Where the store lives.
    fn location(&self) -> &Path;
}
