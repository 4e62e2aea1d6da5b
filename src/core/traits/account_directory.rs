use crate::core::errors::ProvisionError;
use crate::core::models::account::Account;

/// Port for resolving local accounts by name.
pub trait AccountDirectory: Send + Sync {
    /// Look up `name`; [`ProvisionError::UnknownAccount`] if it does not exist.
    fn lookup(&self, name: &str) -> Result<Account, ProvisionError>;
}
