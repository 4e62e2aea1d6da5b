use nix::unistd::User;

use crate::core::errors::ProvisionError;
use crate::core::models::account::Account;
use crate::core::traits::account_directory::AccountDirectory;

/// Accounts from the system user database (`getpwnam`).
#[derive(Clone, Default)]
pub struct SystemAccounts;

impl AccountDirectory for SystemAccounts {
    fn lookup(&self, name: &str) -> Result<Account, ProvisionError> {
        let unknown = || ProvisionError::UnknownAccount {
            account: name.to_string(),
        };
        match User::from_name(name) {
            Ok(Some(user)) => Ok(Account {
                name: user.name,
                uid: user.uid.as_raw(),
                gid: user.gid.as_raw(),
                home: user.dir,
            }),
            Ok(None) => Err(unknown()),
            Err(e) => {
                log::debug!("getpwnam({name}) failed: {e}");
                Err(unknown())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_exists() {
        let root = SystemAccounts.lookup("root").unwrap();
        assert_eq!(root.uid, 0);
    }

    #[test]
    fn missing_account_is_unknown() {
        let err = SystemAccounts.lookup("hostward-no-such-user").unwrap_err();
        assert!(matches!(err, ProvisionError::UnknownAccount { .. }));
    }
}
