//! # NativeFs
//!
//! Backend over the host filesystem via `std::fs`.
//!
//! Exclusive creation maps to `O_CREAT | O_EXCL`, which also refuses to
//! follow a symlink at the final component. Files are created with mode
//! `0o644` and directories with `0o755` on Unix. On Linux, `rename` uses
//! `RENAME_NOREPLACE` so a destination that appears after the caller's check
//! is never replaced. Real-path resolution is delegated to the OS, and paths
//! with a missing tail go through `soft-canonicalize`.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::{
    DirEntry, FileSink, FileType, FsDir, FsError, FsLink, FsPath, FsRead, FsWrite, Metadata,
    Permissions, ReadDirIter,
};

/// Host filesystem backend. Stateless; cheap to copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

impl NativeFs {
    /// Create the backend.
    pub const fn new() -> Self {
        NativeFs
    }
}

fn convert_metadata(meta: &fs::Metadata) -> Metadata {
    let ft = meta.file_type();
    let file_type = if ft.is_symlink() {
        FileType::Symlink
    } else if ft.is_dir() {
        FileType::Directory
    } else if ft.is_file() {
        FileType::File
    } else {
        FileType::Other
    };
    Metadata::from(file_type)
}

fn dir_builder() -> fs::DirBuilder {
    #[allow(unused_mut)]
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(Permissions::default_dir().mode());
    }
    builder
}

/// `soft-canonicalize` reports its own depth limit as `InvalidInput`.
fn canonicalize_error(path: &Path, err: io::Error) -> FsError {
    if err.kind() == io::ErrorKind::InvalidInput && err.to_string().contains("symbolic links") {
        return FsError::SymlinkLoop {
            path: path.to_path_buf(),
        };
    }
    FsError::io("canonicalize", path, err)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn rename_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    use rustix::fs::{CWD, RenameFlags, renameat_with};
    use rustix::io::Errno;

    match renameat_with(CWD, from, CWD, to, RenameFlags::NOREPLACE) {
        Ok(()) => Ok(()),
        // filesystem without RENAME_NOREPLACE support
        Err(Errno::INVAL | Errno::NOSYS) => fs::rename(from, to),
        Err(errno) => Err(errno.into()),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn rename_no_replace(from: &Path, to: &Path) -> io::Result<()> {
    fs::rename(from, to)
}

impl FsRead for NativeFs {
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        fs::metadata(path)
            .map(|m| convert_metadata(&m))
            .map_err(|e| FsError::io("metadata", path, e))
    }
}

impl FsWrite for NativeFs {
    fn create_new(&self, path: &Path) -> Result<Box<dyn FileSink>, FsError> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(Permissions::default_file().mode());
        }
        let file = options
            .open(path)
            .map_err(|e| FsError::io("create", path, e))?;
        Ok(Box::new(file))
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_file(path).map_err(|e| FsError::io("remove_file", path, e))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        rename_no_replace(from, to).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => FsError::io("rename", to, e),
            _ => FsError::io("rename", from, e),
        })
    }
}

impl FsDir for NativeFs {
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        let entries = fs::read_dir(path).map_err(|e| FsError::io("read_dir", path, e))?;
        let dir = path.to_path_buf();
        Ok(ReadDirIter::new(entries.map(move |entry| {
            let entry = entry.map_err(|e| FsError::io("read_dir", &dir, e))?;
            Ok(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
            })
        })))
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        dir_builder()
            .create(path)
            .map_err(|e| FsError::io("create_dir", path, e))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        dir_builder()
            .recursive(true)
            .create(path)
            .map_err(|e| FsError::io("create_dir_all", path, e))
    }

    fn remove_dir(&self, path: &Path) -> Result<(), FsError> {
        fs::remove_dir(path).map_err(|e| FsError::io("remove_dir", path, e))
    }
}

impl FsLink for NativeFs {
    fn symlink(&self, target: &Path, link: &Path) -> Result<(), FsError> {
        #[cfg(unix)]
        let result = std::os::unix::fs::symlink(target, link);
        #[cfg(windows)]
        let result = std::os::windows::fs::symlink_file(target, link);
        result.map_err(|e| FsError::io("symlink", link, e))
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf, FsError> {
        fs::read_link(path).map_err(|e| FsError::io("read_link", path, e))
    }

    fn symlink_metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        fs::symlink_metadata(path)
            .map(|m| convert_metadata(&m))
            .map_err(|e| FsError::io("symlink_metadata", path, e))
    }
}

impl FsPath for NativeFs {
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        fs::canonicalize(path).map_err(|e| FsError::io("canonicalize", path, e))
    }

    fn soft_canonicalize(&self, path: &Path) -> Result<PathBuf, FsError> {
        soft_canonicalize::soft_canonicalize(path).map_err(|e| canonicalize_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::io::Write;

    #[test]
    fn create_new_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let fs = NativeFs::new();

        let mut sink = fs.create_new(&path).unwrap();
        sink.write_all(b"one").unwrap();
        sink.sync().unwrap();
        drop(sink);

        let err = fs.create_new(&path).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(std::fs::read(&path).unwrap(), b"one");
    }

    #[cfg(unix)]
    #[test]
    fn create_new_refuses_dangling_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(outside.path().join("victim"), &link).unwrap();

        let err = NativeFs.create_new(&link).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!outside.path().join("victim").exists());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_metadata_does_not_follow() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("link")).unwrap();

        let fs = NativeFs;
        assert!(fs.symlink_metadata(&dir.path().join("link")).unwrap().is_symlink());
        assert!(fs.metadata(&dir.path().join("link")).unwrap().is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn create_dir_uses_default_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new");
        NativeFs.create_dir(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        // umask may clear bits, never add them
        assert_eq!(mode & !0o755, 0);
    }

    #[test]
    fn remove_dir_non_empty_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("f"), b"x").unwrap();

        let err = NativeFs.remove_dir(&sub).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn read_dir_lists_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"").unwrap();

        let entries: Vec<_> = NativeFs
            .read_dir(dir.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a");
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn rename_never_replaces_destination() {
        let dir = tempfile::tempdir().unwrap();
        let (from, to) = (dir.path().join("from"), dir.path().join("to"));
        std::fs::write(&from, b"from").unwrap();
        std::fs::write(&to, b"to").unwrap();

        let err = NativeFs.rename(&from, &to).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { ref path, .. } if *path == to));
        assert_eq!(std::fs::read(&to).unwrap(), b"to");
        assert_eq!(std::fs::read(&from).unwrap(), b"from");
    }

    #[test]
    fn soft_canonicalize_appends_missing_tail() {
        let dir = tempfile::tempdir().unwrap();
        let real = std::fs::canonicalize(dir.path()).unwrap();

        let resolved = NativeFs
            .soft_canonicalize(&dir.path().join("missing/deeper"))
            .unwrap();
        assert_eq!(resolved, real.join("missing/deeper"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        let looped = dir.path().join("loop");
        std::os::unix::fs::symlink(&looped, &looped).unwrap();

        let err = NativeFs.canonicalize(&looped).unwrap_err();
        assert!(matches!(err, FsError::SymlinkLoop { .. }), "{err:?}");

        let err = NativeFs.soft_canonicalize(&looped.join("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden, "{err:?}");
    }
}
