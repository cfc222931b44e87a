//! # rootbound
//!
//! Root-confined path resolution and filesystem mutation for untrusted callers.
//!
//! A caller names files with *virtual paths* relative to a configured root.
//! Before anything is touched, the path is cleaned and checked lexically,
//! then every existing ancestor is resolved through its symlinks and the
//! result must still sit under the root. Mutations then re-inspect their
//! target and lean on atomic filesystem primitives, so racing requests see a
//! conflict instead of clobbering each other.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use rootbound::{ErrorKind, NativeFs, RootsConfig, Storage};
//!
//! # fn main() -> Result<(), rootbound::FsError> {
//! # let tmp = tempfile::tempdir().unwrap();
//! # std::fs::create_dir(tmp.path().join("files")).unwrap();
//! # std::fs::create_dir(tmp.path().join("public")).unwrap();
//! let storage = Storage::open(NativeFs, &RootsConfig {
//!     storage_root: tmp.path().join("files"),
//!     public_root: Some(tmp.path().join("public")),
//! })?;
//!
//! let report = storage.upload("reports/2026", [("q1.pdf", &b"%PDF"[..])])?;
//! assert!(report.is_complete());
//!
//! storage.share("reports/2026/q1.pdf")?;
//! storage.unshare("reports/2026/q1.pdf")?;
//!
//! let err = storage.delete("../../etc/passwd").unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::PathInvalid);
//! # Ok(())
//! # }
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Storage`] | One method per API operation, raw strings in, payloads out |
//! | [`PathResolver`] | Validates caller paths against a [`Root`]; never mutates |
//! | [`FilesystemService`] | Mutations on already-resolved paths |
//! | [`Fs`] | Backend seam; [`NativeFs`] is the `std::fs` implementation |
//! | [`FsError`] | Error type; [`FsError::kind`] gives the [`ErrorKind`] |
//! | [`VirtualPath`] | A cleaned caller path |
//!
//! ---
//!
//! ## Backend Traits
//!
//! ```text
//! FsRead + FsWrite + FsDir + FsLink + FsPath = Fs
//! ```
//!
//! [`Fs`] has a blanket implementation. [`FsPath`] provides symlink-aware
//! canonicalization on top of [`FsRead`] and [`FsLink`]; backends only opt in.
//! Backends can be wrapped with a [`Layer`], such as [`AuditLayer`].
//!
//! ---
//!
//! ## Error Handling
//!
//! ```rust
//! use rootbound::{ConflictKind, ErrorKind, FsError};
//! use std::path::PathBuf;
//!
//! let err = FsError::AlreadyExists {
//!     path: PathBuf::from("/srv/files/a.txt"),
//!     conflict: ConflictKind::File,
//! };
//! assert_eq!(err.kind(), ErrorKind::Conflict);
//! assert_eq!(err.to_string(), "file already exists: /srv/files/a.txt");
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! All backend traits require `Send + Sync` and take `&self`. There is no
//! in-process locking; concurrent requests are serialized by the filesystem
//! (exclusive create, atomic rename).
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`RootsConfig`], payloads, [`Metadata`] and `ErrorBody` |

// Private modules
mod error;
mod ext;
mod layer;
mod native;
mod path;
mod resolver;
mod root;
mod service;
mod storage;
mod traits;
mod types;

// Public re-exports - error types
pub use error::{ConflictKind, ErrorKind, FsError};

#[cfg(feature = "serde")]
pub use error::ErrorBody;

// Public re-exports - core types
pub use types::{
    Created, DirEntry, FileType, Metadata, Permissions, Removed, Renamed, SavedFile, Shared,
    UploadFailure, UploadReport,
};

// Public re-exports - backend traits
pub use traits::{FileSink, Fs, FsDir, FsLink, FsPath, FsRead, FsWrite, ReadDirIter};

// Public re-exports - paths and roots
pub use path::{VirtualPath, sanitize_file_name, validate_name};
pub use root::{Root, Roots, RootsConfig};

// Public re-exports - resolution and mutation
pub use resolver::PathResolver;
pub use service::FilesystemService;
pub use storage::Storage;

// Public re-exports - infrastructure
pub use ext::FsExt;
pub use layer::{AuditLayer, Audited, Layer, LayerExt};
pub use native::NativeFs;
