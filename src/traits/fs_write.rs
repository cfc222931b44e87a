//! Write operations.

use std::io::{self, Write};
use std::path::Path;

use crate::FsError;

/// A freshly created file that can be forced to stable storage.
///
/// Returned by [`FsWrite::create_new`].
pub trait FileSink: Write + Send {
    /// Flush data and metadata to durable storage (`fsync`).
    fn sync(&mut self) -> io::Result<()>;
}

impl FileSink for std::fs::File {
    fn sync(&mut self) -> io::Result<()> {
        std::fs::File::sync_all(self)
    }
}

/// Write operations for a backend.
///
/// None of these methods overwrite silently where the backend can avoid it;
/// callers layer their own conflict checks on top.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite: Send + Sync {
    /// Create a file exclusively and open it for writing.
    ///
    /// Must fail if anything (including a dangling symlink) already exists at
    /// `path`. This is the primitive that serializes concurrent uploads.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if `path` already exists
    /// - [`FsError::NotFound`] if the parent directory does not exist
    fn create_new(&self, path: &Path) -> Result<Box<dyn FileSink>, FsError>;

    /// Remove a file or symlink (the link itself, never its target).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Rename a file or directory in a single atomic call.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the source or destination parent does not exist
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;
}
