//! Symlink operations.

use std::path::{Path, PathBuf};

use crate::{FsError, Metadata};

/// Symlink operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsLink`.
pub trait FsLink: Send + Sync {
    /// Create a symbolic link.
    ///
    /// # Arguments
    ///
    /// * `target` - The path the symlink points to (does not need to exist)
    /// * `link` - The path where the symlink is created
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `link` already exists
    /// - [`FsError::NotFound`] if parent of `link` does not exist
    fn symlink(&self, target: &Path, link: &Path) -> Result<(), FsError>;

    /// Read the target of a symbolic link.
    ///
    /// Returns the raw target path (not canonicalized).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError>;

    /// Get metadata without following symlinks (`lstat`).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError>;
}
