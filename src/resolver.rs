//! # PathResolver
//!
//! Decides whether a caller-supplied path is safe to touch, and where it
//! really lands. Never mutates.
//!
//! ## Containment
//!
//! Every resolver runs the same two-step check:
//!
//! 1. **Lexical**: [`VirtualPath::parse`] rejects absolute input, null bytes
//!    and any `..` left after cleaning, before the filesystem is consulted.
//! 2. **Real**: the existing prefix of `root + path` is resolved through every
//!    symlink ([`FsPath::soft_canonicalize`]) and must still sit under the
//!    root's real path. This catches a symlink anywhere on the chain, not just
//!    at the leaf.
//!
//! Operations that act on an existing entry (delete, rename, move, share)
//! resolve only the *parent* that way and then inspect the leaf with `lstat`,
//! so a symlink leaf is seen, and refused, rather than followed.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::path::validate_name;
use crate::{ConflictKind, Fs, FsError, FsExt, Metadata, Root, VirtualPath};

/// Path resolution against one or two [`Root`]s.
///
/// Borrows a backend; holds no other state. Roots are passed to every call.
#[derive(Debug)]
pub struct PathResolver<'a, B: ?Sized> {
    fs: &'a B,
}

impl<B: ?Sized> Clone for PathResolver<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: ?Sized> Copy for PathResolver<'_, B> {}

impl<'a, B: Fs + ?Sized> PathResolver<'a, B> {
    /// Create a resolver over `fs`.
    pub fn new(fs: &'a B) -> Self {
        Self { fs }
    }

    // ========================================================================
    // Shared containment
    // ========================================================================

    /// Real location of `vpath` under `root`, following every existing symlink.
    fn contain(&self, root: &Root, vpath: &VirtualPath) -> Result<PathBuf, FsError> {
        let joined = root.real().join(vpath.as_path());
        let real = self.fs.soft_canonicalize(&joined).inspect_err(|e| {
            if matches!(e, FsError::SymlinkDenied { .. }) {
                warn!(path = %vpath, "dangling symlink on path");
            }
        })?;
        if !root.contains(&real) {
            warn!(
                path = %vpath,
                real = %real.display(),
                root = %root.real().display(),
                "path resolves outside root"
            );
            return Err(FsError::EscapesRoot { path: real });
        }
        Ok(real)
    }

    /// Real parent joined with the unresolved leaf name. The root is refused.
    fn contain_leaf(
        &self,
        root: &Root,
        vpath: &VirtualPath,
        operation: &'static str,
    ) -> Result<PathBuf, FsError> {
        let name = vpath
            .file_name()
            .ok_or(FsError::RootTargeted { operation })?;
        let parent = self.contain(root, &vpath.parent())?;
        let path = parent.join(name);
        if path == root.real() {
            return Err(FsError::RootTargeted { operation });
        }
        Ok(path)
    }

    /// An existing, non-symlink, non-root entry.
    fn existing_entry(
        &self,
        root: &Root,
        raw: &str,
        operation: &'static str,
    ) -> Result<(PathBuf, Metadata), FsError> {
        let vpath = VirtualPath::parse(raw)?;
        let path = self.contain_leaf(root, &vpath, operation)?;
        match self.fs.lstat_opt(&path)? {
            None => Err(FsError::NotFound { path }),
            Some(meta) if meta.is_symlink() => {
                warn!(path = %vpath, operation, "refusing symlink leaf");
                Err(FsError::SymlinkDenied { path })
            }
            Some(meta) => Ok((path, meta)),
        }
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
    // Per-operation resolvers
    // ========================================================================

    /// Destination directory for an upload. May not exist yet; the root is
    /// allowed.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] for malformed input
    /// - [`FsError::EscapesRoot`] / [`FsError::SymlinkDenied`] for symlink escapes
    /// - [`FsError::NotADirectory`] if it exists and is not a directory
    pub fn resolve_target_dir(&self, root: &Root, raw: &str) -> Result<PathBuf, FsError> {
        let vpath = VirtualPath::parse(raw)?;
        let real = self.contain(root, &vpath)?;
        if let Some(meta) = self.fs.lstat_opt(&real)? {
            if !meta.is_dir() {
                return Err(FsError::NotADirectory { path: real });
            }
        }
        debug!(path = %vpath, resolved = %real.display(), "upload target resolved");
        Ok(real)
    }

    /// An existing entry to delete. Symlinks and the root are refused.
    ///
    /// # Errors
    ///
    /// - [`FsError::RootTargeted`] for empty or root-denoting input
    /// - [`FsError::NotFound`] if nothing is there
    /// - [`FsError::SymlinkDenied`] if the entry is a symlink
    pub fn resolve_delete_path(&self, root: &Root, raw: &str) -> Result<PathBuf, FsError> {
        let (path, _) = self.existing_entry(root, raw, "delete")?;
        debug!(resolved = %path.display(), "delete target resolved");
        Ok(path)
    }

    /// A directory to create under an existing, real parent directory.
    ///
    /// Returns the path to create (real parent + leaf) and the cleaned virtual
    /// path for reporting. Parents are never created.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidName`] for a malformed leaf
    /// - [`FsError::NotFound`] if the parent is missing
    /// - [`FsError::SymlinkDenied`] if the parent is a symlink
    /// - [`FsError::NotADirectory`] if the parent is not a directory
    pub fn resolve_mkdir_path(
        &self,
        root: &Root,
        raw: &str,
    ) -> Result<(PathBuf, VirtualPath), FsError> {
        let vpath = VirtualPath::parse(raw)?;
        let name = vpath
            .file_name()
            .ok_or(FsError::RootTargeted { operation: "mkdir" })?;
        validate_name(name)?;

        let parent_vpath = vpath.parent();
        if !parent_vpath.is_root() {
            let lexical = root.real().join(parent_vpath.as_path());
            match self.fs.lstat_opt(&lexical)? {
                None => return Err(FsError::NotFound { path: lexical }),
                Some(meta) if meta.is_symlink() => {
                    warn!(path = %parent_vpath, "refusing mkdir under symlink");
                    return Err(FsError::SymlinkDenied { path: lexical });
                }
                Some(meta) if !meta.is_dir() => {
                    return Err(FsError::NotADirectory { path: lexical });
                }
                Some(_) => {}
            }
        }

        let parent = self.contain(root, &parent_vpath)?;
        let path = parent.join(name);
        debug!(path = %vpath, resolved = %path.display(), "mkdir target resolved");
        Ok((path, vpath))
    }

    /// Source and destination for a rename within the same parent.
    ///
    /// # Errors
    ///
    /// - Anything [`resolve_delete_path`](Self::resolve_delete_path) returns
    /// - [`FsError::InvalidName`] if `new_name` is not a simple name
    /// - [`FsError::AlreadyExists`] if the destination exists
    pub fn resolve_rename_paths(
        &self,
        root: &Root,
        old: &str,
        new_name: &str,
    ) -> Result<(PathBuf, PathBuf), FsError> {
        let (from, _) = self.existing_entry(root, old, "rename")?;
        validate_name(new_name)?;

        let parent = from.parent().ok_or(FsError::RootTargeted {
            operation: "rename",
        })?;
        let to = parent.join(new_name);
        self.ensure_absent(&to)?;

        debug!(from = %from.display(), to = %to.display(), "rename resolved");
        Ok((from, to))
    }

    /// Source and destination for a move anywhere inside the root.
    ///
    /// # Errors
    ///
    /// - Anything [`resolve_delete_path`](Self::resolve_delete_path) returns,
    ///   for either side
    /// - [`FsError::NotFound`] if the destination parent is missing
    /// - [`FsError::AlreadyExists`] if the destination exists
    /// - [`FsError::InvalidPath`] when moving a directory into itself
    pub fn resolve_move_paths(
        &self,
        root: &Root,
        old: &str,
        new: &str,
    ) -> Result<(PathBuf, PathBuf), FsError> {
        let (from, meta) = self.existing_entry(root, old, "move")?;

        let new_vpath = VirtualPath::parse(new)?;
        let to = self.contain_leaf(root, &new_vpath, "move")?;

        if meta.is_dir() && to.starts_with(&from) {
            return Err(FsError::InvalidPath {
                path: new.to_string(),
                reason: "destination inside source",
            });
        }
        if let Some(parent) = to.parent() {
            if !self.fs.is_dir(parent)? {
                return Err(FsError::NotFound {
                    path: parent.to_path_buf(),
                });
            }
        }
        self.ensure_absent(&to)?;

        debug!(from = %from.display(), to = %to.display(), "move resolved");
        Ok((from, to))
    }

    /// Source file under `storage` and its mirrored share path under `public`.
    ///
    /// An existing share pointing at exactly this source is accepted, which
    /// makes re-sharing idempotent.
    ///
    /// # Errors
    ///
    /// - Anything [`resolve_delete_path`](Self::resolve_delete_path) returns
    /// - [`FsError::NotAFile`] if the source is not a regular file
    /// - [`FsError::AlreadyExists`] (share) if something else is at the
    ///   public path
    pub fn resolve_share_public_path(
        &self,
        storage: &Root,
        public: &Root,
        raw: &str,
    ) -> Result<(PathBuf, PathBuf), FsError> {
        let (source, meta) = self.existing_entry(storage, raw, "share")?;
        if !meta.is_file() {
            return Err(FsError::NotAFile { path: source });
        }

        let vpath = VirtualPath::parse(raw)?;
        let link = self.contain_leaf(public, &vpath, "share")?;

        match self.fs.lstat_opt(&link)? {
            None => {}
            Some(existing) if existing.is_symlink() && self.fs.read_link(&link)? == source => {
                debug!(path = %vpath, "already shared");
            }
            Some(_) => {
                return Err(FsError::AlreadyExists {
                    path: link,
                    conflict: ConflictKind::Share,
                });
            }
        }

        debug!(source = %source.display(), link = %link.display(), "share resolved");
        Ok((source, link))
    }

    /// A share entry under `public` to remove. Existence is checked by the
    /// service, which also decides how to treat non-symlinks.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] for malformed input
    /// - [`FsError::RootTargeted`] for the public root itself
    pub fn resolve_public_share_path(&self, public: &Root, raw: &str) -> Result<PathBuf, FsError> {
        let vpath = VirtualPath::parse(raw)?;
        self.contain_leaf(public, &vpath, "unshare")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, NativeFs};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        storage: Root,
        public: Root,
        outside: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = dir.path().join("storage");
        let public = dir.path().join("public");
        let outside = dir.path().join("outside");
        for d in [&storage, &public, &outside] {
            fs::create_dir(d).unwrap();
        }
        Fixture {
            storage: Root::open(&NativeFs, &storage).unwrap(),
            public: Root::open(&NativeFs, &public).unwrap(),
            outside: fs::canonicalize(&outside).unwrap(),
            _dir: dir,
        }
    }

    fn resolver() -> PathResolver<'static, NativeFs> {
        PathResolver::new(&NativeFs)
    }

    fn all_resolvers(fx: &Fixture, raw: &str) -> Vec<Result<(), FsError>> {
        let r = resolver();
        vec![
            r.resolve_target_dir(&fx.storage, raw).map(drop),
            r.resolve_delete_path(&fx.storage, raw).map(drop),
            r.resolve_mkdir_path(&fx.storage, raw).map(drop),
            r.resolve_rename_paths(&fx.storage, raw, "x").map(drop),
            r.resolve_move_paths(&fx.storage, raw, "x").map(drop),
            r.resolve_move_paths(&fx.storage, "a.txt", raw).map(drop),
            r.resolve_share_public_path(&fx.storage, &fx.public, raw).map(drop),
            r.resolve_public_share_path(&fx.public, raw).map(drop),
        ]
    }

    #[test]
    fn every_resolver_rejects_parent_traversal() {
        let fx = fixture();
        fs::write(fx.storage.real().join("a.txt"), b"a").unwrap();
        for raw in ["..", "../x", "a/../../x", "../../etc"] {
            for result in all_resolvers(&fx, raw) {
                assert_eq!(result.unwrap_err().kind(), ErrorKind::PathInvalid, "{raw}");
            }
        }
    }

    #[test]
    fn every_resolver_rejects_absolute_paths() {
        let fx = fixture();
        fs::write(fx.storage.real().join("a.txt"), b"a").unwrap();
        let absolute = fx.storage.real().join("a.txt");
        for raw in ["/etc", "/", absolute.to_str().unwrap()] {
            for result in all_resolvers(&fx, raw) {
                assert_eq!(result.unwrap_err().kind(), ErrorKind::PathInvalid, "{raw}");
            }
        }
    }

    #[test]
    fn target_dir_may_be_missing() {
        let fx = fixture();
        let resolved = resolver()
            .resolve_target_dir(&fx.storage, "new/deeper/")
            .unwrap();
        assert_eq!(resolved, fx.storage.real().join("new/deeper"));
    }

    #[test]
    fn target_dir_root_is_allowed() {
        let fx = fixture();
        let resolved = resolver().resolve_target_dir(&fx.storage, "").unwrap();
        assert_eq!(resolved, fx.storage.real());
    }

    #[test]
    fn target_dir_rejects_file() {
        let fx = fixture();
        fs::write(fx.storage.real().join("f"), b"").unwrap();
        let err = resolver().resolve_target_dir(&fx.storage, "f").unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn target_dir_rejects_symlinked_ancestor_escape() {
        let fx = fixture();
        std::os::unix::fs::symlink(&fx.outside, fx.storage.real().join("link")).unwrap();

        for raw in ["link", "link/sub", "link/sub/deeper"] {
            let err = resolver().resolve_target_dir(&fx.storage, raw).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Forbidden, "{raw}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn target_dir_rejects_dangling_symlink() {
        let fx = fixture();
        std::os::unix::fs::symlink(
            fx.outside.join("not-yet"),
            fx.storage.real().join("dangling"),
        )
        .unwrap();

        let err = resolver()
            .resolve_target_dir(&fx.storage, "dangling/sub")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_on_path_is_forbidden() {
        let fx = fixture();
        let looped = fx.storage.real().join("loop");
        std::os::unix::fs::symlink(&looped, &looped).unwrap();

        for result in [
            resolver().resolve_target_dir(&fx.storage, "loop/sub"),
            resolver().resolve_delete_path(&fx.storage, "loop/x"),
        ] {
            assert_eq!(result.unwrap_err().kind(), ErrorKind::Forbidden);
        }
    }

    #[cfg(unix)]
    #[test]
    fn target_dir_follows_internal_symlink() {
        let fx = fixture();
        fs::create_dir(fx.storage.real().join("real")).unwrap();
        std::os::unix::fs::symlink(
            fx.storage.real().join("real"),
            fx.storage.real().join("alias"),
        )
        .unwrap();

        let resolved = resolver()
            .resolve_target_dir(&fx.storage, "alias/new")
            .unwrap();
        assert_eq!(resolved, fx.storage.real().join("real/new"));
    }

    #[test]
    fn delete_refuses_root() {
        let fx = fixture();
        for raw in ["", ".", "a/.."] {
            let err = resolver().resolve_delete_path(&fx.storage, raw).unwrap_err();
            assert!(matches!(err, FsError::RootTargeted { .. }), "{raw:?}");
        }
    }

    #[test]
    fn delete_requires_existing_target() {
        let fx = fixture();
        let err = resolver()
            .resolve_delete_path(&fx.storage, "missing")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn delete_refuses_symlink_leaf() {
        let fx = fixture();
        fs::write(fx.storage.real().join("target.txt"), b"t").unwrap();
        std::os::unix::fs::symlink(
            fx.storage.real().join("target.txt"),
            fx.storage.real().join("link.txt"),
        )
        .unwrap();

        let err = resolver()
            .resolve_delete_path(&fx.storage, "link.txt")
            .unwrap_err();
        assert!(matches!(err, FsError::SymlinkDenied { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn delete_refuses_entry_behind_escaping_ancestor() {
        let fx = fixture();
        fs::write(fx.outside.join("secret"), b"s").unwrap();
        std::os::unix::fs::symlink(&fx.outside, fx.storage.real().join("link")).unwrap();

        let err = resolver()
            .resolve_delete_path(&fx.storage, "link/secret")
            .unwrap_err();
        assert!(matches!(err, FsError::EscapesRoot { .. }));
    }

    #[test]
    fn mkdir_requires_existing_parent() {
        let fx = fixture();
        let err = resolver()
            .resolve_mkdir_path(&fx.storage, "a/b")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn mkdir_returns_real_parent_and_virtual_path() {
        let fx = fixture();
        fs::create_dir_all(fx.storage.real().join("photos/2026")).unwrap();

        let (path, vpath) = resolver()
            .resolve_mkdir_path(&fx.storage, "photos//2026/vacation/")
            .unwrap();
        assert_eq!(path, fx.storage.real().join("photos/2026/vacation"));
        assert_eq!(vpath.to_dir_string(), "photos/2026/vacation/");
    }

    #[test]
    fn mkdir_refuses_file_parent() {
        let fx = fixture();
        fs::write(fx.storage.real().join("f"), b"").unwrap();
        let err = resolver()
            .resolve_mkdir_path(&fx.storage, "f/sub")
            .unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn mkdir_refuses_symlink_parent_even_inside_root() {
        let fx = fixture();
        fs::create_dir(fx.storage.real().join("real")).unwrap();
        std::os::unix::fs::symlink(
            fx.storage.real().join("real"),
            fx.storage.real().join("alias"),
        )
        .unwrap();

        let err = resolver()
            .resolve_mkdir_path(&fx.storage, "alias/new")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[test]
    fn mkdir_refuses_root() {
        let fx = fixture();
        let err = resolver().resolve_mkdir_path(&fx.storage, "").unwrap_err();
        assert!(matches!(err, FsError::RootTargeted { .. }));
    }

    #[test]
    fn rename_stays_in_parent() {
        let fx = fixture();
        fs::create_dir(fx.storage.real().join("docs")).unwrap();
        fs::write(fx.storage.real().join("docs/a.txt"), b"a").unwrap();

        let (from, to) = resolver()
            .resolve_rename_paths(&fx.storage, "docs/a.txt", "b.txt")
            .unwrap();
        assert_eq!(from, fx.storage.real().join("docs/a.txt"));
        assert_eq!(to, fx.storage.real().join("docs/b.txt"));
    }

    #[test]
    fn rename_rejects_non_simple_name() {
        let fx = fixture();
        fs::write(fx.storage.real().join("a.txt"), b"a").unwrap();
        for name in ["", "..", "sub/b.txt", "sub\\b.txt"] {
            let err = resolver()
                .resolve_rename_paths(&fx.storage, "a.txt", name)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::PathInvalid, "{name:?}");
        }
    }

    #[test]
    fn rename_conflicts_with_existing_destination() {
        let fx = fixture();
        fs::write(fx.storage.real().join("a.txt"), b"a").unwrap();
        fs::create_dir(fx.storage.real().join("b")).unwrap();

        let err = resolver()
            .resolve_rename_paths(&fx.storage, "a.txt", "b")
            .unwrap_err();
        assert_eq!(err.conflict(), Some(ConflictKind::Directory));
    }

    #[test]
    fn move_checks_destination_independently() {
        let fx = fixture();
        fs::write(fx.storage.real().join("a.txt"), b"a").unwrap();
        fs::create_dir(fx.storage.real().join("archive")).unwrap();

        let (from, to) = resolver()
            .resolve_move_paths(&fx.storage, "a.txt", "archive/a.txt")
            .unwrap();
        assert_eq!(from, fx.storage.real().join("a.txt"));
        assert_eq!(to, fx.storage.real().join("archive/a.txt"));

        let err = resolver()
            .resolve_move_paths(&fx.storage, "a.txt", "missing/a.txt")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = resolver()
            .resolve_move_paths(&fx.storage, "a.txt", "")
            .unwrap_err();
        assert!(matches!(err, FsError::RootTargeted { .. }));
    }

    #[test]
    fn move_refuses_directory_into_itself() {
        let fx = fixture();
        fs::create_dir_all(fx.storage.real().join("a/b")).unwrap();

        let err = resolver()
            .resolve_move_paths(&fx.storage, "a", "a/b/a")
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidPath { .. }));
    }

    #[test]
    fn share_requires_regular_file() {
        let fx = fixture();
        fs::create_dir(fx.storage.real().join("dir")).unwrap();

        let err = resolver()
            .resolve_share_public_path(&fx.storage, &fx.public, "dir")
            .unwrap_err();
        assert!(matches!(err, FsError::NotAFile { .. }));
    }

    #[test]
    fn share_mirrors_virtual_path() {
        let fx = fixture();
        fs::create_dir_all(fx.storage.real().join("a/b")).unwrap();
        fs::write(fx.storage.real().join("a/b/f.txt"), b"f").unwrap();

        let (source, link) = resolver()
            .resolve_share_public_path(&fx.storage, &fx.public, "a/b/f.txt")
            .unwrap();
        assert_eq!(source, fx.storage.real().join("a/b/f.txt"));
        assert_eq!(link, fx.public.real().join("a/b/f.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn share_accepts_identical_link_and_rejects_others() {
        let fx = fixture();
        fs::write(fx.storage.real().join("f.txt"), b"f").unwrap();
        fs::write(fx.storage.real().join("g.txt"), b"g").unwrap();
        std::os::unix::fs::symlink(
            fx.storage.real().join("f.txt"),
            fx.public.real().join("f.txt"),
        )
        .unwrap();
        std::os::unix::fs::symlink(
            fx.storage.real().join("f.txt"),
            fx.public.real().join("g.txt"),
        )
        .unwrap();

        assert!(
            resolver()
                .resolve_share_public_path(&fx.storage, &fx.public, "f.txt")
                .is_ok()
        );

        let err = resolver()
            .resolve_share_public_path(&fx.storage, &fx.public, "g.txt")
            .unwrap_err();
        assert_eq!(err.conflict(), Some(ConflictKind::Share));
    }

    #[test]
    fn public_share_path_refuses_root() {
        let fx = fixture();
        let err = resolver()
            .resolve_public_share_path(&fx.public, "./")
            .unwrap_err();
        assert!(matches!(err, FsError::RootTargeted { .. }));
    }
}
