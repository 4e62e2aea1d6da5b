use crate::core::errors::ProvisionError;

/// Port for remote identity providers that publish public keys.
pub trait KeySource: Send + Sync {
    /// Fetch the raw key material published for `identity`.
    ///
    /// Implementations must fail, not hang: network errors, timeouts and
    /// non-2xx responses become [`ProvisionError::FetchFailed`].
    fn fetch(&self, identity: &str) -> Result<Vec<String>, ProvisionError>;

    /// Short provider name for messages (e.g. "github").
    fn name(&self) -> &str;
}
