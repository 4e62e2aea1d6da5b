use crate::core::errors::ProvisionError;
use crate::core::models::key_record::{KeyRecord, dedup_keys};
use crate::core::traits::key_source::KeySource;
use crate::core::traits::key_store::KeyStore;

/// What a provisioning run did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    /// Keys now in the store.
    pub installed: usize,
    /// Keys that were not in the store before.
    pub added: usize,
    /// Keys that were in the store and are gone now.
    pub removed: usize,
}

impl ProvisionReport {
    pub fn is_change(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Installs the keys a remote identity publishes as the sole contents
/// of a local authorized-keys store.
pub struct KeyProvisioner<S: KeySource> {
    pub source: S,
}

impl<S: KeySource> KeyProvisioner<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch, validate, and install the keys of `identity` into `store`.
    ///
    /// The store is fully replaced, so keys revoked at the provider disappear.
    /// Fails with [`ProvisionError::NoKeysFound`] before touching the store
    /// when the provider returns nothing usable.
    pub fn provision<K: KeyStore + ?Sized>(
        &self,
        identity: &str,
        store: &K,
    ) -> Result<ProvisionReport, ProvisionError> {
        let keys = self.fetch_keys(identity)?;
        let previous = store.list()?;

        store.replace_all(&keys)?;

        let report = diff_report(&previous, &keys);
        log::info!(
            "installed {} key(s) for '{}' into {} (+{} -{})",
            report.installed,
            identity,
            store.location().display(),
            report.added,
            report.removed
        );
        Ok(report)
    }

    /// Report what [`provision`](Self::provision) would do, without writing.
    pub fn preview<K: KeyStore + ?Sized>(
        &self,
        identity: &str,
        store: &K,
    ) -> Result<ProvisionReport, ProvisionError> {
        let keys = self.fetch_keys(identity)?;
        let previous = store.list()?;
        Ok(diff_report(&previous, &keys))
    }

    /// Fetch and normalize: drop blank or malformed entries, deduplicate,
    /// and refuse an empty result.
    pub fn fetch_keys(&self, identity: &str) -> Result<Vec<KeyRecord>, ProvisionError> {
        let raw = self.source.fetch(identity)?;
        log::debug!(
            "{} returned {} entries for '{}'",
            self.source.name(),
            raw.len(),
            identity
        );

        let mut keys = Vec::with_capacity(raw.len());
        for entry in &raw {
            match KeyRecord::parse(entry) {
                Some(key) => {
                    log::debug!("accepted {} key", key.key_type());
                    keys.push(key);
                }
                None if entry.trim().is_empty() => {}
                None => log::warn!("dropping malformed key entry for '{identity}'"),
            }
        }

        let keys = dedup_keys(keys);
        if keys.is_empty() {
            return Err(ProvisionError::NoKeysFound {
                identity: identity.to_string(),
            });
        }
        Ok(keys)
    }
}

fn diff_report(previous: &[KeyRecord], next: &[KeyRecord]) -> ProvisionReport {
    ProvisionReport {
        installed: next.len(),
        added: next.iter().filter(|k| !previous.contains(k)).count(),
        removed: previous.iter().filter(|k| !next.contains(k)).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    struct StaticSource(Result<Vec<String>, String>);

    impl StaticSource {
        fn keys(keys: &[&str]) -> Self {
            Self(Ok(keys.iter().map(|k| k.to_string()).collect()))
        }
    }

    impl KeySource for StaticSource {
        fn fetch(&self, identity: &str) -> Result<Vec<String>, ProvisionError> {
            self.0.clone().map_err(|reason| ProvisionError::FetchFailed {
                identity: identity.to_string(),
                reason,
            })
        }

        fn name(&self) -> &str {
            "static"
        }
    }

    struct MemoryStore {
        keys: Mutex<Vec<KeyRecord>>,
        path: PathBuf,
    }

    impl MemoryStore {
        fn with(keys: &[&str]) -> Self {
            Self {
                keys: Mutex::new(keys.iter().filter_map(|k| KeyRecord::parse(k)).collect()),
                path: PathBuf::from("/home/deploy/.ssh/authorized_keys"),
            }
        }

        fn materials(&self) -> Vec<String> {
            self.keys
                .lock()
                .unwrap()
                .iter()
                .map(|k| k.material.clone())
                .collect()
        }
    }

    impl KeyStore for MemoryStore {
        fn list(&self) -> Result<Vec<KeyRecord>, ProvisionError> {
            Ok(self.keys.lock().unwrap().clone())
        }

        fn replace_all(&self, keys: &[KeyRecord]) -> Result<(), ProvisionError> {
            *self.keys.lock().unwrap() = keys.to_vec();
            Ok(())
        }

        fn location(&self) -> &Path {
            &self.path
        }
    }

    #[test]
    fn full_replace_drops_revoked_keys() {
        let store = MemoryStore::with(&["ssh-ed25519 K1"]);
        let provisioner =
            KeyProvisioner::new(StaticSource::keys(&["ssh-ed25519 K2", "ssh-rsa K3"]));

        let report = provisioner.provision("octocat", &store).unwrap();

        assert_eq!(store.materials(), vec!["ssh-ed25519 K2", "ssh-rsa K3"]);
        assert_eq!(
            report,
            ProvisionReport {
                installed: 2,
                added: 2,
                removed: 1
            }
        );
        assert!(report.is_change());
    }

    #[test]
    fn empty_provider_list_is_no_keys_found() {
        let store = MemoryStore::with(&["ssh-ed25519 K1"]);
        let provisioner = KeyProvisioner::new(StaticSource::keys(&[]));

        let err = provisioner.provision("octocat", &store).unwrap_err();

        assert!(matches!(err, ProvisionError::NoKeysFound { .. }));
        assert_eq!(store.materials(), vec!["ssh-ed25519 K1"]);
    }

    #[test]
    fn blank_entries_count_as_no_keys() {
        let store = MemoryStore::with(&[]);
        let provisioner = KeyProvisioner::new(StaticSource::keys(&["", "   ", "\n"]));
        let err = provisioner.provision("octocat", &store).unwrap_err();
        assert!(matches!(err, ProvisionError::NoKeysFound { .. }));
    }

    #[test]
    fn duplicates_and_blanks_are_dropped() {
        let store = MemoryStore::with(&[]);
        let provisioner = KeyProvisioner::new(StaticSource::keys(&[
            "ssh-ed25519 A",
            "",
            "ssh-ed25519 A",
            "ssh-rsa B\nssh-rsa C",
            "ssh-rsa D",
        ]));

        let report = provisioner.provision("octocat", &store).unwrap();

        assert_eq!(report.installed, 2);
        assert_eq!(store.materials(), vec!["ssh-ed25519 A", "ssh-rsa D"]);
    }

    #[test]
    fn fetch_failure_leaves_store_untouched() {
        let store = MemoryStore::with(&["ssh-ed25519 K1"]);
        let provisioner = KeyProvisioner::new(StaticSource(Err("timed out".into())));

        let err = provisioner.provision("octocat", &store).unwrap_err();

        assert!(matches!(err, ProvisionError::FetchFailed { .. }));
        assert_eq!(store.materials(), vec!["ssh-ed25519 K1"]);
    }

    #[test]
    fn rerun_with_same_keys_is_no_change() {
        let store = MemoryStore::with(&["ssh-ed25519 K1"]);
        let provisioner = KeyProvisioner::new(StaticSource::keys(&["ssh-ed25519 K1"]));
        let report = provisioner.provision("octocat", &store).unwrap();
        assert!(!report.is_change());
    }

    #[test]
    fn preview_does_not_write() {
        let store = MemoryStore::with(&["ssh-ed25519 K1"]);
        let provisioner = KeyProvisioner::new(StaticSource::keys(&["ssh-rsa K2"]));
        let report = provisioner.preview("octocat", &store).unwrap();
        assert_eq!(report.added, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(store.materials(), vec!["ssh-ed25519 K1"]);
    }
}
