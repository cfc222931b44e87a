//! Virtual paths and name validation.
//!
//! Everything here is pure string work: nothing touches the filesystem, so
//! these checks run before any I/O on behalf of a caller.

use std::fmt;
use std::path::Path;

use crate::FsError;

/// A cleaned, caller-supplied path relative to a root.
///
/// Invariants: no leading or trailing `/`, no empty, `.` or `..` segments, no
/// null bytes. The empty path denotes the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// Clean and validate raw caller input.
    ///
    /// Separators are collapsed, `.` segments dropped and `a/..` pairs
    /// cancelled. Input that is absolute, contains a null byte, or still has a
    /// `..` segment after cleaning is rejected.
    ///
    /// # Errors
    ///
    /// - [`FsError::InvalidPath`] for any of the rejections above
    ///
    /// # Example
    ///
    /// ```rust
    /// use rootbound::VirtualPath;
    ///
    /// let p = VirtualPath::parse("photos//2026/./x/../vacation/").unwrap();
    /// assert_eq!(p.as_str(), "photos/2026/vacation");
    /// assert!(VirtualPath::parse("a/../../etc").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, FsError> {
        if raw.contains('\0') {
            return Err(invalid(raw, "null byte"));
        }
        if raw.starts_with('/') || raw.starts_with('\\') || Path::new(raw).is_absolute() {
            return Err(invalid(raw, "absolute path"));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split(|c| c == '/' || (cfg!(windows) && c == '\\')) {
            match segment {
                "" | "." => {}
                ".." => match segments.last() {
                    Some(&last) if last != ".." => {
                        segments.pop();
                    }
                    _ => segments.push(".."),
                },
                name => segments.push(name),
            }
        }

        if segments.contains(&"..") {
            return Err(invalid(raw, "parent traversal"));
        }

        Ok(VirtualPath(segments.join("/")))
    }

    /// The root of a namespace.
    pub fn root() -> Self {
        VirtualPath(String::new())
    }

    /// Returns `true` if this denotes the root itself.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The cleaned path as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The cleaned path as a relative `Path`.
    #[inline]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }

    /// Last segment, `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            None
        } else {
            self.0.rsplit('/').next()
        }
    }

    /// Everything but the last segment. The root's parent is the root.
    pub fn parent(&self) -> VirtualPath {
        match self.0.rfind('/') {
            Some(idx) => VirtualPath(self.0[..idx].to_string()),
            None => VirtualPath::root(),
        }
    }

    /// Append one already-validated name.
    pub fn join(&self, name: &str) -> VirtualPath {
        if self.is_root() {
            VirtualPath(name.to_string())
        } else {
            VirtualPath(format!("{}/{}", self.0, name))
        }
    }

    /// Directory form for responses: trailing `/`, root as `/`.
    pub fn to_dir_string(&self) -> String {
        if self.is_root() {
            "/".to_string()
        } else {
            format!("{}/", self.0)
        }
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("/")
        } else {
            f.write_str(&self.0)
        }
    }
}

fn invalid(raw: &str, reason: &'static str) -> FsError {
    FsError::InvalidPath {
        path: raw.replace('\0', "\\0"),
        reason,
    }
}

/// Check that `name` is a single path segment.
///
/// # Errors
///
/// - [`FsError::InvalidName`] if empty, `.`, `..`, or containing a separator
///   (`/` or `\`) or a null byte
pub fn validate_name(name: &str) -> Result<(), FsError> {
    let reason = if name.is_empty() {
        "empty"
    } else if name == "." || name == ".." {
        "reserved name"
    } else if name.contains('/') || name.contains('\\') {
        "contains a separator"
    } else if name.contains('\0') {
        "null byte"
    } else {
        return Ok(());
    };
    Err(FsError::InvalidName {
        name: name.replace('\0', "\\0"),
        reason,
    })
}

/// Reduce a declared upload file name to a safe base name.
///
/// Leading directory components (either separator style) are dropped
/// silently. The result must be a valid name and must not start with `.`.
///
/// # Errors
///
/// - [`FsError::InvalidName`] if nothing usable remains or the name is hidden
///
/// # Example
///
/// ```rust
/// use rootbound::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("C:\\Users\\me\\report.pdf").unwrap(), "report.pdf");
/// assert_eq!(sanitize_file_name("../../etc/passwd").unwrap(), "passwd");
/// assert!(sanitize_file_name(".bashrc").is_err());
/// ```
pub fn sanitize_file_name(raw: &str) -> Result<&str, FsError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    validate_name(base)?;
    if base.starts_with('.') {
        return Err(FsError::InvalidName {
            name: base.to_string(),
            reason: "hidden file",
        });
    }
    Ok(base)
}
