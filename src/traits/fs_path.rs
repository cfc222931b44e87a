//! # FsPath Trait
//!
//! Real-path resolution with a default implementation.
//!
//! ## Responsibility
//! - Resolve a path to its real form (symlinks followed, `.`/`..` normalized)
//! - Resolve a path whose tail does not exist yet, following every symlink on
//!   the existing prefix
//!
//! ## Dependencies
//! - [`FsRead`] for followed metadata
//! - [`FsLink`] for symlink inspection
//! - [`FsError`] for error handling
//!
//! ## Usage
//!
//! ```rust
//! use rootbound::FsPath;
//! use std::path::Path;
//!
//! fn resolve<B: FsPath>(backend: &B) -> Result<(), rootbound::FsError> {
//!     // Every component must exist
//!     let real = backend.canonicalize(Path::new("/srv/files/photos"))?;
//!
//!     // Missing tail is appended lexically to the real existing prefix
//!     let planned = backend.soft_canonicalize(Path::new("/srv/files/photos/new/dir"))?;
//!     Ok(())
//! }
//! ```

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::{FileType, FsError, FsLink, FsRead};

// ============================================================================
// Constants
// ============================================================================

/// Maximum depth for symlink resolution to prevent infinite loops.
const MAX_SYMLINK_DEPTH: usize = 40;

// ============================================================================
// Trait Definition
// ============================================================================

/// Real-path resolution with a default implementation.
///
/// The defaults walk the path component by component through
/// [`FsLink::symlink_metadata`] and [`FsLink::read_link`], which suits
/// backends that store symlinks as data. Backends that delegate to an OS
/// override both methods with native calls.
///
/// Implement with `impl FsPath for MyBackend {}` to take the defaults.
pub trait FsPath: FsRead + FsLink {
    /// Resolve all symlinks and normalize path (`.`, `..`).
    ///
    /// All path components must exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] - A component doesn't exist (including the
    ///   target of a dangling symlink)
    /// - [`FsError::SymlinkLoop`] - Exceeded the symlink depth limit
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        resolve_path_internal(self, path, 0)
    }

    /// Like [`canonicalize`](Self::canonicalize), but allows a missing tail.
    ///
    /// Finds the deepest ancestor that exists without following it
    /// (`lstat`), resolves that ancestor fully, then appends the missing
    /// components lexically. Every symlink on the existing prefix is followed,
    /// so the result is the real location a later create would land in.
    ///
    /// # Errors
    ///
    /// - [`FsError::SymlinkDenied`] - The deepest existing entry is a dangling
    ///   symlink; creating through it would follow it to an unchecked target.
    ///   Overrides may instead resolve the link to its missing target, which
    ///   callers must then check like any other result
    /// - [`FsError::SymlinkLoop`] - Exceeded the symlink depth limit
    fn soft_canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        let mut existing = path.to_path_buf();
        let mut missing: Vec<OsString> = Vec::new();

        loop {
            match self.symlink_metadata(&existing) {
                Ok(_) => break,
                Err(FsError::NotFound { .. } | FsError::NotADirectory { .. }) => {
                    match existing.file_name() {
                        Some(name) => missing.push(name.to_os_string()),
                        None => break,
                    }
                    existing.pop();
                }
                Err(e) => return Err(e),
            }
        }

        let mut real = match self.canonicalize(&existing) {
            Ok(real) => real,
            Err(FsError::NotFound { .. }) => {
                return Err(FsError::SymlinkDenied { path: existing });
            }
            Err(e) => return Err(e),
        };

        for name in missing.iter().rev() {
            real.push(name);
        }
        Ok(real)
    }
}

// ============================================================================
// Default Implementation
// ============================================================================

/// Internal path resolution with symlink depth tracking.
fn resolve_path_internal<F: FsRead + FsLink + ?Sized>(
    fs: &F,
    path: &Path,
    depth: usize,
) -> Result<PathBuf, FsError> {
    if depth > MAX_SYMLINK_DEPTH {
        return Err(FsError::SymlinkLoop {
            path: path.to_path_buf(),
        });
    }

    let mut resolved = PathBuf::new();

    for component in path.components() {
        match component {
            Component::RootDir => {
                resolved = PathBuf::from("/");
            }
            Component::CurDir => {}
            Component::ParentDir => {
                // `resolved` is already real, so popping is exact
                resolved.pop();
                if resolved.as_os_str().is_empty() {
                    resolved = PathBuf::from("/");
                }
            }
            Component::Normal(name) => {
                resolved.push(name);

                let meta = fs.symlink_metadata(&resolved)?;
                if meta.file_type == FileType::Symlink {
                    let target = fs.read_link(&resolved)?;
                    resolved.pop();

                    let full_target = if target.is_absolute() {
                        target
                    } else {
                        resolved.join(&target)
                    };
                    resolved = resolve_path_internal(fs, &full_target, depth + 1)?;
                }
            }
            Component::Prefix(_) => {
                resolved.push(component);
            }
        }
    }

    if resolved.as_os_str().is_empty() {
        resolved = PathBuf::from("/");
    }

    Ok(resolved)
}

// ============================================================================
// Tests
// ============================================================================
