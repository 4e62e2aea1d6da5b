use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use nix::unistd::{Gid, Uid};

use crate::core::errors::PatchError;
use crate::core::traits::config_files::ConfigFiles;

/// Configuration files on the local filesystem.
///
/// Symbolic links are resolved first and the file they point at is the one
/// rewritten; the link stays. Writes go to a temporary file next to that
/// file, take its mode and owner, and are renamed over it. A file with more
/// than one hard link is instead truncated and rewritten through its inode.
#[derive(Clone, Default)]
pub struct LocalConfigFiles;

impl LocalConfigFiles {
    pub fn new() -> Self {
        Self
    }
}

/// Map an I/O failure on `path` to the matching `PatchError`.
fn map_io(path: &Path, err: io::Error) -> PatchError {
    match err.kind() {
        io::ErrorKind::NotFound => PatchError::NotFound {
            path: path.to_path_buf(),
            key: String::new(),
        },
        io::ErrorKind::PermissionDenied => PatchError::PermissionDenied {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
        _ => PatchError::WriteFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        },
    }
}

impl ConfigFiles for LocalConfigFiles {
    fn read(&self, path: &Path) -> Result<String, PatchError> {
        fs::read_to_string(path).map_err(|e| map_io(path, e))
    }

    fn write_preserving(&self, path: &Path, content: &str) -> Result<(), PatchError> {
        let target = fs::canonicalize(path).map_err(|e| map_io(path, e))?;
        let meta = fs::metadata(&target).map_err(|e| map_io(path, e))?;
        if meta.nlink() > 1 {
            log::debug!("{} has other hard links, rewriting in place", target.display());
            return write_in_place(path, &target, content);
        }
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let mut staged = tempfile::Builder::new()
            .prefix(".hostward-")
            .tempfile_in(dir)
            .map_err(|e| map_io(path, e))?;

        staged
            .write_all(content.as_bytes())
            .and_then(|_| staged.flush())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| map_io(path, e))?;

        staged
            .as_file()
            .set_permissions(fs::Permissions::from_mode(meta.mode() & 0o7777))
            .map_err(|e| map_io(path, e))?;

        let staged_meta = staged.as_file().metadata().map_err(|e| map_io(path, e))?;
        if staged_meta.uid() != meta.uid() || staged_meta.gid() != meta.gid() {
            nix::unistd::chown(
                staged.path(),
                Some(Uid::from_raw(meta.uid())),
                Some(Gid::from_raw(meta.gid())),
            )
            .map_err(|e| map_io(path, io::Error::from(e)))?;
        }

        staged
            .persist(&target)
            .map_err(|e| map_io(path, e.error))?;
        Ok(())
    }
}

/// Overwrite `target` through its existing inode so every hard link sees the
/// new content. Mode and owner are untouched.
fn write_in_place(path: &Path, target: &Path, content: &str) -> Result<(), PatchError> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(target)
        .map_err(|e| map_io(path, e))?;
    file.write_all(content.as_bytes())
        .and_then(|_| file.sync_all())
        .map_err(|e| map_io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_replaces_content_and_keeps_mode() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sshd_config");
        fs::write(&path, "#PermitRootLogin yes\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        let before = fs::metadata(&path).unwrap();

        let files = LocalConfigFiles::new();
        files.write_preserving(&path, "PermitRootLogin no\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "PermitRootLogin no\n");
        let after = fs::metadata(&path).unwrap();
        assert_eq!(after.mode() & 0o7777, 0o640);
        assert_eq!(after.uid(), before.uid());
        assert_eq!(after.gid(), before.gid());
    }

    #[test]
    fn no_staging_file_left_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("conf");
        fs::write(&path, "a\n").unwrap();

        LocalConfigFiles::new().write_preserving(&path, "b\n").unwrap();

        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("conf")]);
    }

    #[test]
    fn write_through_symlink_updates_target() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real").join("sshd_config");
        fs::create_dir(real.parent().unwrap()).unwrap();
        fs::write(&real, "#PermitRootLogin yes\n").unwrap();
        fs::set_permissions(&real, fs::Permissions::from_mode(0o640)).unwrap();
        let link = tmp.path().join("sshd_config");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        LocalConfigFiles::new()
            .write_preserving(&link, "PermitRootLogin no\n")
            .unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&link).unwrap(), real);
        assert_eq!(fs::read_to_string(&real).unwrap(), "PermitRootLogin no\n");
        assert_eq!(fs::metadata(&real).unwrap().mode() & 0o7777, 0o640);
    }

    #[test]
    fn write_keeps_hard_links_shared() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sshd_config");
        fs::write(&path, "#UsePAM no\n").unwrap();
        let twin = tmp.path().join("sshd_config.twin");
        fs::hard_link(&path, &twin).unwrap();

        LocalConfigFiles::new()
            .write_preserving(&path, "UsePAM yes\n")
            .unwrap();

        assert_eq!(fs::read_to_string(&twin).unwrap(), "UsePAM yes\n");
        assert_eq!(
            fs::metadata(&path).unwrap().ino(),
            fs::metadata(&twin).unwrap().ino()
        );
    }

    #[test]
    fn read_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = LocalConfigFiles::new()
            .read(&tmp.path().join("missing"))
            .unwrap_err();
        assert!(matches!(err, PatchError::NotFound { .. }));
    }

    #[test]
    fn write_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = LocalConfigFiles::new()
            .write_preserving(&tmp.path().join("missing"), "x")
            .unwrap_err();
        assert!(matches!(err, PatchError::NotFound { .. }));
    }

    #[test]
    fn io_kinds_map_to_patch_errors() {
        let p = Path::new("/etc/ssh/sshd_config");
        assert!(matches!(
            map_io(p, io::Error::from(io::ErrorKind::PermissionDenied)),
            PatchError::PermissionDenied { .. }
        ));
        assert!(matches!(
            map_io(p, io::Error::from(io::ErrorKind::NotFound)),
            PatchError::NotFound { .. }
        ));
        assert!(matches!(
            map_io(p, io::Error::other("disk full")),
            PatchError::WriteFailed { .. }
        ));
    }
}
