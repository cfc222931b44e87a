//! # Backend Traits
//!
//! The capability traits a storage backend implements.
//!
//! ## Components
//!
//! | Trait | Methods | Role |
//! |-------|---------|------|
//! | [`FsRead`] | `exists`, `metadata` | Symlink-following queries |
//! | [`FsWrite`] | `create_new`, `remove_file`, `rename` | Exclusive create, removal, atomic rename |
//! | [`FsDir`] | `read_dir`, `create_dir`, `create_dir_all`, `remove_dir` | Directory management |
//! | [`FsLink`] | `symlink`, `read_link`, `symlink_metadata` | Symlink handling and `lstat` |
//! | [`FsPath`] | `canonicalize`, `soft_canonicalize` | Real-path resolution |
//!
//! ## Blanket Implementation
//!
//! [`Fs`] is implemented for every type implementing all five components. The
//! resolver and the service only ever ask for `Fs`.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self`. The backends in this
//! crate keep no state; every synchronization point is a filesystem primitive.

mod fs_dir;
mod fs_link;
mod fs_path;
mod fs_read;
mod fs_write;

pub use fs_dir::{FsDir, ReadDirIter};
pub use fs_link::FsLink;
pub use fs_path::FsPath;
pub use fs_read::FsRead;
pub use fs_write::{FileSink, FsWrite};

/// Everything the resolver and the service need from a backend.
///
/// # Blanket Implementation
///
/// Automatically implemented for any type that implements all component
/// traits. You never need to implement `Fs` directly.
///
/// # Example
///
/// ```rust
/// use rootbound::{Fs, FsError};
/// use std::path::Path;
///
/// fn is_empty_dir<B: Fs>(fs: &B, path: &Path) -> Result<bool, FsError> {
///     Ok(fs.read_dir(path)?.next().is_none())
/// }
/// ```
pub trait Fs: FsRead + FsWrite + FsDir + FsLink + FsPath {}

// Blanket implementation - any type implementing all components gets Fs for free
impl<T: FsRead + FsWrite + FsDir + FsLink + FsPath> Fs for T {}
