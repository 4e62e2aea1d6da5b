use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use nix::fcntl::OFlag;

use crate::core::errors::ProvisionError;
use crate::core::models::authorized_key_store::AuthorizedKeyStore;
use crate::core::models::key_record::KeyRecord;
use crate::core::traits::key_store::KeyStore;

/// Header written at the top of every managed file.
const MANAGED_HEADER: &str = "# Managed by hostward. Replaced on every run; local edits are lost.";

/// `authorized_keys` file owned by a local account.
///
/// Format: one key per line. Lines starting with `#` and blank lines are
/// ignored when reading.
///
/// Replacement stages the keys in a temporary file next to the target,
/// with the final mode and owner already applied, then renames it over the
/// target. The temporary file is removed on every failure path. A symbolic
/// link in place of the directory or the file is refused.
pub struct AuthorizedKeysFile {
    store: AuthorizedKeyStore,
}

impl AuthorizedKeysFile {
    pub fn new(store: AuthorizedKeyStore) -> Self {
        Self { store }
    }

    /// Parse a single line into a `KeyRecord`, if it contains a key.
    fn parse_line(line: &str) -> Option<KeyRecord> {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            return None;
        }
        KeyRecord::parse(trimmed)
    }

    fn serialize(keys: &[KeyRecord]) -> String {
        let mut out = String::from(MANAGED_HEADER);
        out.push('\n');
        for key in keys {
            out.push_str(&key.material);
            out.push('\n');
        }
        out
    }

    fn write_failed(&self, reason: impl std::fmt::Display) -> ProvisionError {
        ProvisionError::WriteFailed {
            path: self.store.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn chown(&self, handle: &fs::File, path: &Path) -> Result<(), ProvisionError> {
        std::os::unix::fs::fchown(
            handle,
            Some(self.store.owner.uid),
            Some(self.store.owner.gid),
        )
        .map_err(|e| {
            self.write_failed(format!(
                "cannot give {} to {}: {e}",
                path.display(),
                self.store.owner.name
            ))
        })
    }

    fn set_mode(&self, handle: &fs::File, path: &Path, mode: u32) -> Result<(), ProvisionError> {
        handle
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(|e| self.write_failed(format!("cannot chmod {}: {e}", path.display())))
    }

    fn parent_dir(&self) -> Result<&Path, ProvisionError> {
        self.store
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| self.write_failed("path has no parent directory"))
    }

    /// Fail if `path` exists and is a symbolic link.
    fn refuse_symlink(&self, path: &Path) -> Result<(), ProvisionError> {
        match fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => Err(self.write_failed(format!(
                "{} is a symbolic link; refusing to follow it",
                path.display()
            ))),
            _ => Ok(()),
        }
    }

    /// Create the containing directory if needed, open it without following
    /// links and enforce its mode and owner through the open handle.
    fn open_dir(&self) -> Result<fs::File, ProvisionError> {
        let dir = self.parent_dir()?;
        match fs::symlink_metadata(dir) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(self.write_failed(format!(
                    "{} is a symbolic link; refusing to follow it",
                    dir.display()
                )));
            }
            Ok(meta) if !meta.is_dir() => {
                return Err(self.write_failed(format!("{} is not a directory", dir.display())));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("creating {}", dir.display());
                fs::create_dir_all(dir)
                    .map_err(|e| self.write_failed(format!("cannot create {}: {e}", dir.display())))?;
            }
            Err(e) => {
                return Err(self.write_failed(format!("cannot inspect {}: {e}", dir.display())));
            }
        }

        let handle = fs::OpenOptions::new()
            .read(true)
            .custom_flags((OFlag::O_NOFOLLOW | OFlag::O_DIRECTORY).bits())
            .open(dir)
            .map_err(|e| self.write_failed(format!("cannot open {}: {e}", dir.display())))?;
        self.set_mode(&handle, dir, self.store.dir_mode)?;
        self.chown(&handle, dir)?;
        Ok(handle)
    }
}

impl KeyStore for AuthorizedKeysFile {
    fn list(&self) -> Result<Vec<KeyRecord>, ProvisionError> {
        let bytes = match fs::read(&self.store.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.write_failed(format!("cannot read current keys: {e}"))),
        };
        let content = String::from_utf8_lossy(&bytes);
        Ok(content.lines().filter_map(Self::parse_line).collect())
    }

    fn replace_all(&self, keys: &[KeyRecord]) -> Result<(), ProvisionError> {
        let dir_handle = self.open_dir()?;
        let dir = self.parent_dir()?;
        self.refuse_symlink(&self.store.path)?;

        let mut staged = tempfile::Builder::new()
            .prefix(".authorized_keys-")
            .tempfile_in(dir)
            .map_err(|e| self.write_failed(format!("cannot stage keys: {e}")))?;

        self.set_mode(staged.as_file(), staged.path(), self.store.file_mode)?;
        staged
            .write_all(Self::serialize(keys).as_bytes())
            .and_then(|_| staged.flush())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| self.write_failed(format!("cannot stage keys: {e}")))?;
        self.chown(staged.as_file(), staged.path())?;

        let written = staged
            .persist(&self.store.path)
            .map_err(|e| self.write_failed(e.error))?;

        self.set_mode(&written, &self.store.path, self.store.file_mode)?;
        self.set_mode(&dir_handle, dir, self.store.dir_mode)
    }

    fn location(&self) -> &Path {
        &self.store.path
    }
}
