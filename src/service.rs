//! # FilesystemService
//!
//! Performs mutations on paths that a [`PathResolver`] already validated.
//!
//! Every method re-inspects its target with `lstat` right before acting, and
//! leans on filesystem primitives for the last word: exclusive create for
//! uploads, a single non-replacing `rename` call for renames and moves, and
//! the kernel's own "directory not empty" check for removals. When the
//! primitive reports "already exists" after a clean check, the entry is
//! inspected again and reported as a conflict.

use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::path::sanitize_file_name;
use crate::{
    ConflictKind, Fs, FsError, FsExt, PathResolver, Root, SavedFile, UploadFailure,
    UploadReport,
};

/// Mutating operations over a backend.
///
/// Stateless apart from the backend; share it freely across threads.
#[derive(Debug, Clone, Default)]
pub struct FilesystemService<B> {
    fs: B,
}

impl<B: Fs> FilesystemService<B> {
    /// Wrap a backend.
    pub fn new(fs: B) -> Self {
        Self { fs }
    }

    /// The underlying backend.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.fs
    }

    /// A resolver over the same backend.
    #[inline]
    pub fn resolver(&self) -> PathResolver<'_, B> {
        PathResolver::new(&self.fs)
    }

    // ========================================================================
    // Uploads
    // ========================================================================

    /// Stream `content` into a new file named after `raw_name` in `dir`.
    ///
    /// `dir` is created (with parents) if needed. Only the base name of
    /// `raw_name` is used. The file is created exclusively, synced before
    /// success, and removed again if anything fails after it was created.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidName`] if no usable base name remains
    /// - [`FsError::AlreadyExists`] (file) if the name is taken, including by a
    ///   concurrent upload
    /// - [`FsError::Io`] for write or sync failures
    #[instrument(skip(self, dir, content), fields(dir = %dir.display()))]
    pub fn save_file(
        &self,
        dir: &Path,
        raw_name: &str,
        content: &mut dyn Read,
    ) -> Result<SavedFile, FsError> {
        let name = sanitize_file_name(raw_name)?;
        self.fs.create_dir_all(dir)?;

        let path = dir.join(name);
        if self.fs.lstat_opt(&path)?.is_some() {
            return Err(file_exists(path));
        }

        let mut sink = self.fs.create_new(&path).map_err(|e| match e {
            FsError::AlreadyExists { path, .. } => file_exists(path),
            e => e,
        })?;

        let written = io::copy(content, &mut *sink)
            .and_then(|size| sink.sync().map(|()| size))
            .map_err(|e| FsError::io("write", &path, e));
        drop(sink);

        match written {
            Ok(size) => {
                info!(file = %path.display(), size, "file saved");
                Ok(SavedFile {
                    name: name.to_string(),
                    size,
                })
            }
            Err(e) => {
                if let Err(cleanup) = self.fs.remove_file(&path) {
                    warn!(
                        file = %path.display(),
                        error = %cleanup,
                        "failed to remove partial upload"
                    );
                }
                Err(e)
            }
        }
    }

    /// Save several files into `dir`, one outcome per file.
    ///
    /// Not transactional: files saved before a failure stay saved. Conflicts
    /// are reported as skipped under the stored name, everything else as
    /// failed under the declared name.
    pub fn save_files<I, S, R>(&self, dir: &Path, files: I) -> UploadReport
    where
        I: IntoIterator<Item = (S, R)>,
        S: AsRef<str>,
        R: Read,
    {
        let mut report = UploadReport::default();
        for (name, mut content) in files {
            let name = name.as_ref();
            match self.save_file(dir, name, &mut content) {
                Ok(saved) => report.uploaded.push(saved),
                Err(e) if e.is_conflict() => {
                    let stored = sanitize_file_name(name).unwrap_or(name);
                    report.skipped.push(stored.to_string());
                }
                Err(e) => report.failed.push(UploadFailure {
                    name: name.to_string(),
                    kind: e.kind(),
                    message: e.to_string(),
                }),
            }
        }
        report
    }

    // ========================================================================
    // Entry mutations
    // ========================================================================

    /// Remove a file or an empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if nothing is there
    /// - [`FsError::SymlinkDenied`] if it is a symlink
    /// - [`FsError::DirectoryNotEmpty`] if it is a directory with entries
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn delete(&self, path: &Path) -> Result<(), FsError> {
        let meta = self
            .fs
            .lstat_opt(path)?
            .ok_or_else(|| FsError::NotFound {
                path: path.to_path_buf(),
            })?;

        if meta.is_symlink() {
            return Err(FsError::SymlinkDenied {
                path: path.to_path_buf(),
            });
        }
        if meta.is_dir() {
            if let Some(entry) = self.fs.first_entry(path)? {
                debug!(entry = %entry.name, "directory not empty");
                return Err(FsError::DirectoryNotEmpty {
                    path: path.to_path_buf(),
                });
            }
            self.fs.remove_dir(path)?;
        } else {
            self.fs.remove_file(path)?;
        }

        info!("deleted");
        Ok(())
    }

    /// Create one directory. The parent must already exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] naming whatever is in the way
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn mkdir(&self, path: &Path) -> Result<(), FsError> {
        self.ensure_absent(path)?;
        match self.fs.create_dir(path) {
            Ok(()) => {
                info!("directory created");
                Ok(())
            }
            Err(FsError::AlreadyExists { path, .. }) => {
                debug!("lost mkdir race");
                Err(self.conflict_at(path)?)
            }
            Err(e) => Err(e),
        }
    }

    /// Rename an entry within its directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the source is gone
    /// - [`FsError::SymlinkDenied`] if the source is a symlink
    /// - [`FsError::AlreadyExists`] if the destination exists
    #[instrument(skip(self, from, to), fields(from = %from.display(), to = %to.display()))]
    pub fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.relocate(from, to)?;
        info!("renamed");
        Ok(())
    }

    /// Move an entry anywhere under the same root.
    ///
    /// Same checks as [`rename`](Self::rename); never copies.
    #[instrument(skip(self, from, to), fields(from = %from.display(), to = %to.display()))]
    pub fn move_entry(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.relocate(from, to)?;
        info!("moved");
        Ok(())
    }

    fn relocate(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        match self.fs.lstat_opt(from)? {
            None => {
                return Err(FsError::NotFound {
                    path: from.to_path_buf(),
                });
            }
            Some(meta) if meta.is_symlink() => {
                return Err(FsError::SymlinkDenied {
                    path: from.to_path_buf(),
                });
            }
            Some(_) => {}
        }
        self.ensure_absent(to)?;
        match self.fs.rename(from, to) {
            Err(FsError::AlreadyExists { path, .. }) => {
                debug!("lost rename race");
                Err(self.conflict_at(path)?)
            }
            result => result,
        }
    }

    /// Conflict naming whatever now occupies `path`.
    fn conflict_at(&self, path: PathBuf) -> Result<FsError, FsError> {
        let conflict = self
            .fs
            .lstat_opt(&path)?
            .map_or(ConflictKind::Entry, |m| ConflictKind::of(m.file_type));
        Ok(FsError::AlreadyExists { path, conflict })
    }

    fn ensure_absent(&self, path: &Path) -> Result<(), FsError> {
        match self.fs.lstat_opt(path)? {
            None => Ok(()),
            Some(meta) => Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
                conflict: ConflictKind::of(meta.file_type),
            }),
        }
    }

    // ========================================================================
    // Public shares
    // ========================================================================

    /// Publish `source` as a symlink at `link`, creating parents as needed.
    ///
    /// Sharing the same source twice is a no-op.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] (share) if anything else is at `link`
    #[instrument(
        skip(self, source, link),
        fields(source = %source.display(), link = %link.display())
    )]
    pub fn share_public(&self, source: &Path, link: &Path) -> Result<(), FsError> {
        if let Some(parent) = link.parent() {
            self.fs.create_dir_all(parent)?;
        }

        match self.fs.symlink(source, link) {
            Ok(()) => {
                info!("shared");
                Ok(())
            }
            Err(FsError::AlreadyExists { path, .. }) => {
                let same = match self.fs.lstat_opt(&path)? {
                    Some(meta) if meta.is_symlink() => self.fs.read_link(&path)? == source,
                    _ => false,
                };
                if same {
                    debug!("already shared");
                    Ok(())
                } else {
                    Err(FsError::AlreadyExists {
                        path,
                        conflict: ConflictKind::Share,
                    })
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Remove the share at `raw` under `public`, then prune empty parents.
    ///
    /// Parents are removed bottom-up while empty, stopping at the first
    /// non-empty one and never touching `public` itself. Pruning failures are
    /// logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// - Anything [`PathResolver::resolve_public_share_path`] returns
    /// - [`FsError::NotFound`] if nothing is there
    /// - [`FsError::NotASymlink`] if the entry is not a share
    #[instrument(skip(self, public))]
    pub fn delete_public_share(&self, public: &Root, raw: &str) -> Result<PathBuf, FsError> {
        let link = self.resolver().resolve_public_share_path(public, raw)?;

        match self.fs.lstat_opt(&link)? {
            None => return Err(FsError::NotFound { path: link }),
            Some(meta) if meta.is_symlink() => {}
            Some(meta) => {
                return Err(FsError::NotASymlink {
                    path: link,
                    is_dir: meta.is_dir(),
                });
            }
        }

        self.fs.remove_file(&link)?;
        info!(link = %link.display(), "share removed");

        self.prune_empty_parents(public, &link);
        Ok(link)
    }

    fn prune_empty_parents(&self, public: &Root, link: &Path) {
        let mut current = link.parent();
        while let Some(dir) = current {
            if dir == public.real() || !public.contains(dir) {
                break;
            }
            match self.fs.is_empty_dir(dir) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "share cleanup stopped");
                    break;
                }
            }
            if let Err(e) = self.fs.remove_dir(dir) {
                warn!(dir = %dir.display(), error = %e, "share cleanup stopped");
                break;
            }
            debug!(dir = %dir.display(), "removed empty share directory");
            current = dir.parent();
        }
    }
}

fn file_exists(path: PathBuf) -> FsError {
    FsError::AlreadyExists {
        path,
        conflict: ConflictKind::File,
    }
}
