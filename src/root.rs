//! Containment roots and their configuration.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{FsError, FsPath};

/// An absolute directory that bounds one namespace of virtual paths.
///
/// Holds both the configured path and its real (symlink-free) form, resolved
/// once at construction. Containment checks always compare against the real
/// form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    path: PathBuf,
    real: PathBuf,
}

impl Root {
    /// Validate `path` as a root.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidRoot`] if `path` is relative
    /// - [`FsError::NotFound`] if it does not exist
    /// - [`FsError::NotADirectory`] if it is not a directory
    pub fn open<B: FsPath + ?Sized>(fs: &B, path: impl Into<PathBuf>) -> Result<Self, FsError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(FsError::InvalidRoot {
                path,
                reason: "root must be absolute",
            });
        }
        if !fs.metadata(&path)?.is_dir() {
            return Err(FsError::NotADirectory { path });
        }
        let real = fs.canonicalize(&path)?;
        debug!(root = %path.display(), real = %real.display(), "root opened");
        Ok(Self { path, real })
    }

    /// The path as configured.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The canonical path every resolved path must stay under.
    #[inline]
    pub fn real(&self) -> &Path {
        &self.real
    }

    /// `true` if `path` is the root or lies beneath it (component-wise).
    #[inline]
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.real)
    }
}

/// Root locations as read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RootsConfig {
    /// Storage root for uploads and file management.
    pub storage_root: PathBuf,
    /// Public-share root. Sharing is disabled when absent.
    #[cfg_attr(feature = "serde", serde(default))]
    pub public_root: Option<PathBuf>,
}

/// The validated storage root and optional public-share root.
#[derive(Debug, Clone)]
pub struct Roots {
    storage: Root,
    public: Option<Root>,
}

impl Roots {
    /// Validate both roots.
    ///
    /// # Errors
    ///
    /// - Anything [`Root::open`] returns
    /// - [`FsError::InvalidRoot`] if one root lies inside the other
    pub fn open<B: FsPath + ?Sized>(fs: &B, config: &RootsConfig) -> Result<Self, FsError> {
        let storage = Root::open(fs, &config.storage_root)?;
        let public = match &config.public_root {
            Some(path) => {
                let public = Root::open(fs, path)?;
                if storage.contains(public.real()) || public.contains(storage.real()) {
                    return Err(FsError::InvalidRoot {
                        path: public.path().to_path_buf(),
                        reason: "public root overlaps storage root",
                    });
                }
                Some(public)
            }
            None => None,
        };
        Ok(Self { storage, public })
    }

    /// Build from already-opened roots.
    pub fn new(storage: Root, public: Option<Root>) -> Self {
        Self { storage, public }
    }

    /// The storage root.
    #[inline]
    pub fn storage(&self) -> &Root {
        &self.storage
    }

    /// The public-share root, if sharing is enabled.
    #[inline]
    pub fn public(&self) -> Option<&Root> {
        self.public.as_ref()
    }
}
