use std::path::PathBuf;

use crate::core::errors::{HostwardError, Result};

/// A local account that owns an authorized-keys store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: PathBuf,
}

/// Validate a local account name (`useradd` rules for portable names).
pub fn validate_account_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');

    if !valid_first || !valid_rest || name.len() > 32 {
        return Err(HostwardError::InvalidPlan {
            detail: format!(
                "invalid account name '{name}': use lowercase letters, digits, '_' or '-', \
                 starting with a letter or '_' (max 32 chars)"
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_usual_names() {
        assert!(validate_account_name("deploy").is_ok());
        assert!(validate_account_name("_svc").is_ok());
        assert!(validate_account_name("web-01").is_ok());
    }

    #[test]
    fn rejects_bad_names() {
        assert!(validate_account_name("").is_err());
        assert!(validate_account_name("Root").is_err());
        assert!(validate_account_name("1user").is_err());
        assert!(validate_account_name("a/b").is_err());
        assert!(validate_account_name("../etc").is_err());
        assert!(validate_account_name(&"a".repeat(33)).is_err());
    }
}
