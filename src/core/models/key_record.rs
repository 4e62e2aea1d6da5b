/// One public key belonging to a remote identity.
///
/// `material` is always non-empty and a single line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRecord {
    pub material: String,
}

impl KeyRecord {
    /// Build a record from raw provider output, trimming surrounding
    /// whitespace. Returns `None` for blank or multi-line material.
    pub fn parse(raw: &str) -> Option<Self> {
        let material = raw.trim();
        if material.is_empty() || material.contains(['\n', '\r']) {
            return None;
        }
        Some(Self {
            material: material.to_string(),
        })
    }

    /// The key type token, e.g. `ssh-ed25519`.
    pub fn key_type(&self) -> &str {
        self.material
            .split_whitespace()
            .next()
            .unwrap_or(&self.material)
    }
}

impl std::fmt::Display for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.material)
    }
}

/// Remove duplicates while keeping the provider's order.
pub fn dedup_keys(keys: Vec<KeyRecord>) -> Vec<KeyRecord> {
    let mut seen = std::collections::HashSet::new();
    keys.into_iter()
        .filter(|k| seen.insert(k.material.clone()))
        .collect()
}

/// Whether `identity` is a valid identity-provider login
/// (GitHub rules: alphanumerics and single inner hyphens, max 39 chars).
pub fn is_valid_identity(identity: &str) -> bool {
    !identity.is_empty()
        && identity.len() <= 39
        && !identity.starts_with('-')
        && !identity.ends_with('-')
        && !identity.contains("--")
        && identity.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}
