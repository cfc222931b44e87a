//! Core types: entry metadata and operation payloads.

use crate::ErrorKind;

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// FIFO, socket, device node.
    Other,
}

/// Metadata for a filesystem entry.
///
/// Only what the containment and conflict checks consult.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    /// Type of the entry.
    pub file_type: FileType,
}

impl Metadata {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Returns `true` if this is a symbolic link.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }
}

impl From<FileType> for Metadata {
    fn from(file_type: FileType) -> Self {
        Self { file_type }
    }
}

/// A directory entry returned from `read_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirEntry {
    /// Name of the entry (filename only).
    pub name: String,
}

/// Unix-style mode bits applied to entries this crate creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Default permissions for a new file (0o644 = rw-r--r--).
    #[inline]
    pub const fn default_file() -> Self {
        Self(0o644)
    }

    /// Default permissions for a new directory (0o755 = rwxr-xr-x).
    #[inline]
    pub const fn default_dir() -> Self {
        Self(0o755)
    }
}

// ============================================================================
// Operation payloads
// ============================================================================

/// A file written by an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SavedFile {
    /// Sanitized file name as stored.
    pub name: String,
    /// Bytes written.
    pub size: u64,
}

/// A file an upload could not store for a reason other than a name conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UploadFailure {
    /// File name as declared by the caller.
    pub name: String,
    /// Error classification.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
}

/// Per-request upload summary. Files are independent; nothing is rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UploadReport {
    /// Stored files.
    pub uploaded: Vec<SavedFile>,
    /// Names skipped because something already exists there.
    pub skipped: Vec<String>,
    /// Files that failed otherwise.
    pub failed: Vec<UploadFailure>,
}

impl UploadReport {
    /// `true` when every file was stored.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

/// Result of creating a directory. The path is virtual and ends in `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Created {
    /// Created virtual path.
    pub path: String,
}

/// Result of a rename or move, as virtual paths.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Renamed {
    /// Previous virtual path.
    pub old: String,
    /// New virtual path.
    pub new: String,
}

/// Result of a public share.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Shared {
    /// Virtual path, identical under the storage and public roots.
    pub path: String,
}

/// Result of a delete or unshare.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Removed {
    /// Removed virtual path.
    pub path: String,
}
