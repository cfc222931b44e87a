//! # Layer Trait
//!
//! Tower-style middleware composition for backends.
//!
//! ```text
//! Backend ──▶ Layer::layer() ──▶ Wrapped Backend
//! ```
//!
//! Each middleware provides a wrapper struct that implements the backend
//! traits and a `Layer` that builds it. [`AuditLayer`] is the one shipped
//! here: it records every mutating backend call as a `tracing` event.
//!
//! ```rust
//! use rootbound::{AuditLayer, FilesystemService, LayerExt, NativeFs};
//!
//! let service = FilesystemService::new(NativeFs.layer(AuditLayer::new("uploads")));
//! ```

use std::path::{Path, PathBuf};

use tracing::info;

use crate::{
    FileSink, Fs, FsDir, FsError, FsLink, FsPath, FsRead, FsWrite, Metadata, ReadDirIter,
};

/// A layer that wraps a backend to add functionality.
///
/// Inspired by Tower's `Layer` trait.
///
/// # Type Parameters
///
/// - `B`: The backend type being wrapped
pub trait Layer<B> {
    /// The resulting backend type after applying this layer.
    type Backend;

    /// Wrap the given backend with this layer's functionality.
    fn layer(self, backend: B) -> Self::Backend;
}

/// Extension trait for fluent layer composition.
pub trait LayerExt: Fs + Sized {
    /// Apply a layer to this backend.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Backend {
        layer.layer(self)
    }
}

// Blanket implementation - any Fs backend gets LayerExt for free
impl<B: Fs> LayerExt for B {}

// ============================================================================
// Audit middleware
// ============================================================================

/// Emits one `info` event per mutating backend call, success or failure.
///
/// Events go to the `rootbound::audit` target with the namespace label, the
/// operation name and the affected path(s). Reads are not recorded.
#[derive(Debug, Clone)]
pub struct AuditLayer {
    namespace: String,
}

impl AuditLayer {
    /// Create a layer labelling events with `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl<B: Fs> Layer<B> for AuditLayer {
    type Backend = Audited<B>;

    fn layer(self, backend: B) -> Self::Backend {
        Audited {
            inner: backend,
            namespace: self.namespace,
        }
    }
}

/// Backend wrapped by [`AuditLayer`].
#[derive(Debug, Clone)]
pub struct Audited<B> {
    inner: B,
    namespace: String,
}

impl<B> Audited<B> {
    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn record<T>(&self, operation: &'static str, path: &Path, result: &Result<T, FsError>) {
        match result {
            Ok(_) => info!(
                target: "rootbound::audit",
                namespace = %self.namespace,
                operation,
                path = %path.display(),
                "ok"
            ),
            Err(e) => info!(
                target: "rootbound::audit",
                namespace = %self.namespace,
                operation,
                path = %path.display(),
                error = %e,
                "failed"
            ),
        }
    }
}

impl<B: FsRead> FsRead for Audited<B> {
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.inner.metadata(path)
    }
}

impl<B: FsWrite> FsWrite for Audited<B> {
    fn create_new(&self, path: &Path) -> Result<Box<dyn FileSink>, FsError> {
        let result = self.inner.create_new(path);
        self.record("create", path, &result);
        result
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let result = self.inner.remove_file(path);
        self.record("remove_file", path, &result);
        result
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        let result = self.inner.rename(from, to);
        match &result {
            Ok(()) => info!(
                target: "rootbound::audit",
                namespace = %self.namespace,
                operation = "rename",
                from = %from.display(),
                to = %to.display(),
                "ok"
            ),
            Err(e) => info!(
                target: "rootbound::audit",
                namespace = %self.namespace,
                operation = "rename",
                from = %from.display(),
                to = %to.display(),
                error = %e,
                "failed"
            ),
        }
        result
    }
}

impl<B: FsDir> FsDir for Audited<B> {
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        self.inner.read_dir(path)
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        let result = self.inner.create_dir(path);
        self.record("create_dir", path, &result);
        result
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let result = self.inner.create_dir_all(path);
        self.record("create_dir_all", path, &result);
        result
    }

    fn remove_dir(&self, path: &Path) -> Result<(), FsError> {
        let result = self.inner.remove_dir(path);
        self.record("remove_dir", path, &result);
        result
    }
}

impl<B: FsLink> FsLink for Audited<B> {
    fn symlink(&self, target: &Path, link: &Path) -> Result<(), FsError> {
        let result = self.inner.symlink(target, link);
        self.record("symlink", link, &result);
        result
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        self.inner.read_link(path)
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        self.inner.symlink_metadata(path)
    }
}

impl<B: FsPath> FsPath for Audited<B> {
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        self.inner.canonicalize(path)
    }

    fn soft_canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        self.inner.soft_canonicalize(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NativeFs;

    #[test]
    fn layer_ext_is_auto_implemented() {
        fn _check<B: Fs + LayerExt>() {}
    }

    #[test]
    fn audited_backend_is_fs() {
        fn _takes_fs<T: Fs>(_: &T) {}
        let wrapped = NativeFs.layer(AuditLayer::new("test"));
        _takes_fs(&wrapped);
    }

    #[test]
    fn audited_backend_delegates_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let fs = NativeFs.layer(AuditLayer::new("test"));

        fs.create_dir(&dir.path().join("a")).unwrap();
        assert!(dir.path().join("a").is_dir());

        fs.remove_dir(&dir.path().join("a")).unwrap();
        assert!(!dir.path().join("a").exists());

        let err = fs.remove_dir(&dir.path().join("a")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }
}
