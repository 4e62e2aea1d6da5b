use std::path::PathBuf;

use crate::core::models::account::Account;

/// Mode of the authorized-keys file: owner read/write only.
pub const STORE_FILE_MODE: u32 = 0o600;

/// Mode of the directory holding the authorized-keys file.
pub const STORE_DIR_MODE: u32 = 0o700;

/// Target file holding the installed keys for a local account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedKeyStore {
    pub owner: Account,
    pub path: PathBuf,
    pub file_mode: u32,
    pub dir_mode: u32,
}

impl AuthorizedKeyStore {
    /// Store at `path`, or at `~owner/.ssh/authorized_keys` when `path` is `None`.
    pub fn for_account(owner: Account, path: Option<PathBuf>) -> Self {
        let path = path.unwrap_or_else(|| owner.home.join(".ssh").join("authorized_keys"));
        Self {
            owner,
            path,
            file_mode: STORE_FILE_MODE,
            dir_mode: STORE_DIR_MODE,
        }
    }
}
