//! # Storage
//!
//! One entry point per API operation. Each method takes raw caller strings,
//! resolves them against the configured roots, runs the mutation, and returns
//! a payload naming the affected virtual path(s).
//!
//! ```rust
//! use rootbound::{NativeFs, RootsConfig, Storage};
//!
//! # fn main() -> Result<(), rootbound::FsError> {
//! # let tmp = tempfile::tempdir().unwrap();
//! # let storage_root = tmp.path().to_path_buf();
//! let storage = Storage::open(NativeFs, &RootsConfig {
//!     storage_root,
//!     public_root: None,
//! })?;
//!
//! let created = storage.mkdir("photos")?;
//! assert_eq!(created.path, "photos/");
//! assert!(storage.mkdir("../escape").is_err());
//! # Ok(())
//! # }
//! ```

use std::io::Read;

use tracing::instrument;

use crate::{
    Created, FilesystemService, Fs, FsError, Removed, Renamed, Root, Roots, RootsConfig, Shared,
    UploadReport, VirtualPath,
};

/// A [`FilesystemService`] bound to its roots.
#[derive(Debug, Clone)]
pub struct Storage<B> {
    service: FilesystemService<B>,
    roots: Roots,
}

impl<B: Fs> Storage<B> {
    /// Bind a backend to already-opened roots.
    pub fn new(fs: B, roots: Roots) -> Self {
        Self {
            service: FilesystemService::new(fs),
            roots,
        }
    }

    /// Open the roots named in `config` and bind them to `fs`.
    ///
    /// # Errors
    ///
    /// - Anything [`Roots::open`] returns
    pub fn open(fs: B, config: &RootsConfig) -> Result<Self, FsError> {
        let roots = Roots::open(&fs, config)?;
        Ok(Self::new(fs, roots))
    }

    /// The configured roots.
    #[inline]
    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    /// The service doing the work.
    #[inline]
    pub fn service(&self) -> &FilesystemService<B> {
        &self.service
    }

    fn storage(&self) -> &Root {
        self.roots.storage()
    }

    fn public(&self) -> Result<&Root, FsError> {
        self.roots.public().ok_or(FsError::PublicRootUnset)
    }

    /// Upload `files` into directory `dir`, creating it if needed.
    ///
    /// Fails as a whole only if `dir` itself is rejected; per-file outcomes
    /// are in the report.
    #[instrument(skip(self, files))]
    pub fn upload<I, S, R>(&self, dir: &str, files: I) -> Result<UploadReport, FsError>
    where
        I: IntoIterator<Item = (S, R)>,
        S: AsRef<str>,
        R: Read,
    {
        let target = self
            .service
            .resolver()
            .resolve_target_dir(self.storage(), dir)?;
        Ok(self.service.save_files(&target, files))
    }

    /// Delete a file or empty directory.
    #[instrument(skip(self))]
    pub fn delete(&self, path: &str) -> Result<Removed, FsError> {
        let resolved = self
            .service
            .resolver()
            .resolve_delete_path(self.storage(), path)?;
        self.service.delete(&resolved)?;
        Ok(Removed {
            path: VirtualPath::parse(path)?.to_string(),
        })
    }

    /// Create one directory under an existing parent.
    #[instrument(skip(self))]
    pub fn mkdir(&self, path: &str) -> Result<Created, FsError> {
        let (resolved, vpath) = self
            .service
            .resolver()
            .resolve_mkdir_path(self.storage(), path)?;
        self.service.mkdir(&resolved)?;
        Ok(Created {
            path: vpath.to_dir_string(),
        })
    }

    /// Rename an entry in place.
    #[instrument(skip(self))]
    pub fn rename(&self, old: &str, new_name: &str) -> Result<Renamed, FsError> {
        let (from, to) = self
            .service
            .resolver()
            .resolve_rename_paths(self.storage(), old, new_name)?;
        self.service.rename(&from, &to)?;

        let old = VirtualPath::parse(old)?;
        let new = old.parent().join(new_name);
        Ok(Renamed {
            old: old.to_string(),
            new: new.to_string(),
        })
    }

    /// Move an entry to another location under the storage root.
    #[instrument(skip(self))]
    pub fn move_entry(&self, old: &str, new: &str) -> Result<Renamed, FsError> {
        let (from, to) = self
            .service
            .resolver()
            .resolve_move_paths(self.storage(), old, new)?;
        self.service.move_entry(&from, &to)?;
        Ok(Renamed {
            old: VirtualPath::parse(old)?.to_string(),
            new: VirtualPath::parse(new)?.to_string(),
        })
    }

    /// Publish a stored file under the same virtual path in the public root.
    ///
    /// # Errors
    ///
    /// - [`FsError::PublicRootUnset`] if sharing is not configured
    #[instrument(skip(self))]
    pub fn share(&self, path: &str) -> Result<Shared, FsError> {
        let public = self.public()?;
        let (source, link) = self
            .service
            .resolver()
            .resolve_share_public_path(self.storage(), public, path)?;
        self.service.share_public(&source, &link)?;
        Ok(Shared {
            path: VirtualPath::parse(path)?.to_string(),
        })
    }

    /// Withdraw a public share.
    ///
    /// # Errors
    ///
    /// - [`FsError::PublicRootUnset`] if sharing is not configured
    #[instrument(skip(self))]
    pub fn unshare(&self, path: &str) -> Result<Removed, FsError> {
        let public = self.public()?;
        self.service.delete_public_share(public, path)?;
        Ok(Removed {
            path: VirtualPath::parse(path)?.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, NativeFs};

    fn open(public: bool) -> (tempfile::TempDir, Storage<NativeFs>) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("files")).unwrap();
        std::fs::create_dir(tmp.path().join("public")).unwrap();
        let config = RootsConfig {
            storage_root: tmp.path().join("files"),
            public_root: public.then(|| tmp.path().join("public")),
        };
        let storage = Storage::open(NativeFs, &config).unwrap();
        (tmp, storage)
    }

    #[test]
    fn share_without_public_root_is_forbidden() {
        let (tmp, storage) = open(false);
        std::fs::write(tmp.path().join("files/a.txt"), b"a").unwrap();

        let err = storage.share("a.txt").unwrap_err();
        assert!(matches!(err, FsError::PublicRootUnset));
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        assert!(matches!(
            storage.unshare("a.txt").unwrap_err(),
            FsError::PublicRootUnset
        ));
    }

    #[test]
    fn payloads_use_cleaned_virtual_paths() {
        let (tmp, storage) = open(true);
        std::fs::create_dir(tmp.path().join("files/docs")).unwrap();
        std::fs::write(tmp.path().join("files/docs/a.txt"), b"a").unwrap();

        let renamed = storage.rename("docs//a.txt", "b.txt").unwrap();
        assert_eq!(renamed.old, "docs/a.txt");
        assert_eq!(renamed.new, "docs/b.txt");

        let moved = storage.move_entry("docs/b.txt", "./b.txt").unwrap();
        assert_eq!(moved.new, "b.txt");

        let removed = storage.delete("b.txt").unwrap();
        assert_eq!(removed.path, "b.txt");
    }

    #[test]
    fn upload_reports_per_file() {
        let (tmp, storage) = open(false);
        let report = storage
            .upload("inbox", [("a.txt", &b"a"[..]), ("a.txt", &b"again"[..])])
            .unwrap();
        assert_eq!(report.uploaded.len(), 1);
        assert_eq!(report.skipped, vec!["a.txt".to_string()]);
        assert_eq!(
            std::fs::read(tmp.path().join("files/inbox/a.txt")).unwrap(),
            b"a"
        );
    }
}
