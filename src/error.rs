//! Error types for root-confined filesystem operations.

use std::io;
use std::path::PathBuf;

use crate::FileType;

/// Coarse classification of an [`FsError`].
///
/// Transport layers map each kind to a status code; the kind alone decides
/// whether a failure was the caller's fault or the server's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ErrorKind {
    /// Malformed or escaping caller input. Detected before any filesystem access.
    PathInvalid,
    /// Source or parent does not exist.
    NotFound,
    /// Root targeted, or a symlink stands where none is allowed.
    Forbidden,
    /// Destination exists, directory not empty, or share target mismatch.
    Conflict,
    /// Unexpected I/O failure.
    Internal,
}

/// What kind of entry caused a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ConflictKind {
    /// A regular file is in the way.
    File,
    /// A directory is in the way.
    Directory,
    /// A symlink is in the way.
    Symlink,
    /// A public share exists with a different target.
    Share,
    /// Something exists, type unknown.
    Entry,
}

impl ConflictKind {
    /// The conflict an existing entry of type `file_type` causes.
    pub fn of(file_type: FileType) -> Self {
        match file_type {
            FileType::File => ConflictKind::File,
            FileType::Directory => ConflictKind::Directory,
            FileType::Symlink => ConflictKind::Symlink,
            FileType::Other => ConflictKind::Entry,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ConflictKind::File => "file already exists",
            ConflictKind::Directory => "directory already exists",
            ConflictKind::Symlink => "symlink already exists",
            ConflictKind::Share => "share already exists with a different target",
            ConflictKind::Entry => "entry already exists",
        }
    }
}

fn not_a_symlink(is_dir: &bool) -> &'static str {
    if *is_dir {
        "path is a directory, not a symlink"
    } else {
        "path is not a symlink"
    }
}

/// Error type for path resolution and filesystem operations.
///
/// Every variant carries the context needed to build a user-facing message.
/// Use [`FsError::kind`] to classify it.
///
/// # Examples
///
/// ```rust
/// use rootbound::{ErrorKind, FsError};
///
/// let err = FsError::InvalidPath {
///     path: "../etc".into(),
///     reason: "parent traversal",
/// };
/// assert_eq!(err.kind(), ErrorKind::PathInvalid);
/// assert_eq!(err.to_string(), "invalid path: ../etc (parent traversal)");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Input errors
    /// Caller path is absolute, escaping, or contains a null byte.
    #[error("invalid path: {path} ({reason})")]
    InvalidPath {
        /// The raw path as supplied.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A leaf or file name is not a simple, acceptable name.
    #[error("invalid name: {name:?} ({reason})")]
    InvalidName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A configured root is unusable.
    #[error("invalid root: {path} ({reason})")]
    InvalidRoot {
        /// The configured root.
        path: PathBuf,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Expected a directory.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// Expected a regular file.
    #[error("not a regular file: {path}")]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },

    // Existence errors
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    // Policy errors
    /// The operation targeted the root of a namespace.
    #[error("{operation}: operation not permitted on root")]
    RootTargeted {
        /// The refused operation.
        operation: &'static str,
    },

    /// A symlink was found where the operation refuses to follow one.
    #[error("symlink not allowed: {path}")]
    SymlinkDenied {
        /// The symlink.
        path: PathBuf,
    },

    /// The real (symlink-resolved) path lies outside the root.
    #[error("path escapes root: {path}")]
    EscapesRoot {
        /// The resolved path.
        path: PathBuf,
    },

    /// Too many symlinks while resolving.
    #[error("symlink loop detected: {path}")]
    SymlinkLoop {
        /// Where resolution gave up.
        path: PathBuf,
    },

    /// Public sharing was requested but no public root is configured.
    #[error("public sharing is not configured")]
    PublicRootUnset,

    // Conflicts
    /// Destination already exists.
    #[error("{}: {path}", .conflict.describe())]
    AlreadyExists {
        /// The existing path.
        path: PathBuf,
        /// What is in the way.
        conflict: ConflictKind,
    },

    /// Directory has entries.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The non-empty directory.
        path: PathBuf,
    },

    /// A share was expected but something else is at the path.
    #[error("{}: {path}", not_a_symlink(.is_dir))]
    NotASymlink {
        /// The offending path.
        path: PathBuf,
        /// Whether the entry is a directory.
        is_dir: bool,
    },

    // Backend errors
    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Converts an I/O error, keeping the taxonomy where the kind is known.
    ///
    /// `ELOOP` becomes [`FsError::SymlinkLoop`], matching what the default
    /// path walker reports.
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        #[cfg(unix)]
        if source.raw_os_error() == Some(rustix::io::Errno::LOOP.raw_os_error()) {
            return FsError::SymlinkLoop { path };
        }
        match source.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path },
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists {
                path,
                conflict: ConflictKind::Entry,
            },
            io::ErrorKind::DirectoryNotEmpty => FsError::DirectoryNotEmpty { path },
            io::ErrorKind::NotADirectory => FsError::NotADirectory { path },
            _ => FsError::Io {
                operation,
                path,
                source,
            },
        }
    }

    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::InvalidPath { .. }
            | FsError::InvalidName { .. }
            | FsError::InvalidRoot { .. }
            | FsError::NotADirectory { .. }
            | FsError::NotAFile { .. } => ErrorKind::PathInvalid,
            FsError::NotFound { .. } => ErrorKind::NotFound,
            FsError::RootTargeted { .. }
            | FsError::SymlinkDenied { .. }
            | FsError::EscapesRoot { .. }
            | FsError::SymlinkLoop { .. }
            | FsError::PublicRootUnset => ErrorKind::Forbidden,
            FsError::AlreadyExists { .. }
            | FsError::DirectoryNotEmpty { .. }
            | FsError::NotASymlink { .. } => ErrorKind::Conflict,
            FsError::Io { .. } => ErrorKind::Internal,
        }
    }

    /// The conflicting entry type, for [`FsError::AlreadyExists`].
    pub fn conflict(&self) -> Option<ConflictKind> {
        match self {
            FsError::AlreadyExists { conflict, .. } => Some(*conflict),
            _ => None,
        }
    }

    /// Returns `true` if this is a [`ErrorKind::Conflict`].
    #[inline]
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// Serializable summary for transport layers.
    #[cfg(feature = "serde")]
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            conflict: self.conflict(),
            message: self.to_string(),
        }
    }
}

/// Wire-friendly rendering of an [`FsError`].
#[cfg(feature = "serde")]
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorBody {
    /// Error classification.
    pub kind: ErrorKind,
    /// Conflicting entry type, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictKind>,
    /// Human-readable message.
    pub message: String,
}
