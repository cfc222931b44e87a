//! # Extension Traits
//!
//! Convenience queries built from the backend traits.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`lstat_opt`](FsExt::lstat_opt) | `lstat`, with "missing" as `None` |
//! | [`is_dir`](FsExt::is_dir) | Directory check (follows symlinks) |
//! | [`first_entry`](FsExt::first_entry) | One entry of a directory, if any |
//! | [`is_empty_dir`](FsExt::is_empty_dir) | Directory has no entries |

use std::path::Path;

use crate::{DirEntry, Fs, FsError, Metadata};

/// Extension methods for any backend.
///
/// # Example
///
/// ```rust
/// use rootbound::{Fs, FsExt, FsError};
/// use std::path::Path;
///
/// fn is_plain_file<B: Fs>(backend: &B, path: &Path) -> Result<bool, FsError> {
///     Ok(backend
///         .lstat_opt(path)?
///         .is_some_and(|m| m.is_file()))
/// }
/// ```
pub trait FsExt: Fs {
    /// Metadata without following symlinks, `None` if nothing is there.
    ///
    /// Returns `Err` only for actual I/O errors.
    fn lstat_opt(&self, path: &Path) -> Result<Option<Metadata>, FsError> {
        match self.symlink_metadata(path) {
            Ok(m) => Ok(Some(m)),
            Err(FsError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Check if the path points to a directory (follows symlinks).
    ///
    /// Returns `Ok(false)` if the path doesn't exist.
    fn is_dir(&self, path: &Path) -> Result<bool, FsError> {
        match self.metadata(path) {
            Ok(m) => Ok(m.is_dir()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Any one entry of a directory, `None` if it is empty.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the directory does not exist
    fn first_entry(&self, path: &Path) -> Result<Option<DirEntry>, FsError> {
        self.read_dir(path)?.next().transpose()
    }

    /// Check whether a directory has no entries.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the directory does not exist
    fn is_empty_dir(&self, path: &Path) -> Result<bool, FsError> {
        Ok(self.first_entry(path)?.is_none())
    }
}

// Blanket implementation - any Fs backend gets FsExt for free
impl<B: Fs + ?Sized> FsExt for B {}
