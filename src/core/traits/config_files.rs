use std::path::Path;

use crate::core::errors::PatchError;

/// Port for reading and rewriting text configuration files.
pub trait ConfigFiles: Send + Sync {
    /// Read the whole file as UTF-8 text.
    fn read(&self, path: &Path) -> Result<String, PatchError>;

    /// Replace the file contents, keeping its mode and ownership.
    fn write_preserving(&self, path: &Path, content: &str) -> Result<(), PatchError>;
}
