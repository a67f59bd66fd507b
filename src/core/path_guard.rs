//! Path validation and containment checks.
//!
//! Every artifact path handled by the engine passes through [`PathGuard`],
//! on the write path (pipeline output) and on the read path (artifact
//! retrieval) alike:
//! - `validate` rejects empty, absolute and `..`-carrying paths without
//!   touching the filesystem
//! - `resolve` joins a validated path onto a base directory and verifies that
//!   the canonicalized result is still inside the canonicalized base

use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Path rejections
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Path cannot be empty")]
    Empty,

    #[error("Path contains a NUL byte")]
    Nul,

    #[error("Absolute paths are not allowed: {0}")]
    Absolute(String),

    #[error("Parent directory references (..) are not allowed: {0}")]
    ParentSegment(String),

    #[error("Path resolves outside its root: {0}")]
    Escapes(String),

    #[error("Cannot resolve {path}: {reason}")]
    Unresolvable { path: String, reason: String },
}

impl PathError {
    /// Containment violation (as opposed to a malformed path)
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Escapes(_))
    }
}

/// Shared path-safety discipline for reads and writes
#[derive(Debug, Clone, Copy, Default)]
pub struct PathGuard;

impl PathGuard {
    /// Validate a relative path (no filesystem access)
    pub fn validate(relative_path: &str) -> Result<(), PathError> {
        if relative_path.trim().is_empty() {
            return Err(PathError::Empty);
        }

        if relative_path.contains('\0') {
            return Err(PathError::Nul);
        }

        if is_absolute_like(relative_path) {
            return Err(PathError::Absolute(relative_path.to_string()));
        }

        // Both separators, so `..\\..\\x` is caught on every platform
        if relative_path
            .split(|c| c == '/' || c == '\\')
            .any(|segment| segment == "..")
        {
            return Err(PathError::ParentSegment(relative_path.to_string()));
        }

        Ok(())
    }

    /// Resolve `relative_path` against `base_dir` and check containment
    ///
    /// `base_dir` must exist. The target itself may not exist yet: the deepest
    /// existing ancestor is canonicalized (following symlinks, dangling ones
    /// included) and the rest is re-appended, so a symlink pointing outside
    /// the base is caught before anything is created through it.
    pub fn resolve(base_dir: &Path, relative_path: &str) -> Result<PathBuf, PathError> {
        Self::validate(relative_path)?;

        let base = base_dir
            .canonicalize()
            .map_err(|e| PathError::Unresolvable {
                path: base_dir.display().to_string(),
                reason: e.to_string(),
            })?;

        let resolved =
            canonicalize_lenient(&base.join(relative_path)).map_err(|e| {
                PathError::Unresolvable {
                    path: relative_path.to_string(),
                    reason: e.to_string(),
                }
            })?;

        if resolved == base || !resolved.starts_with(&base) {
            return Err(PathError::Escapes(relative_path.to_string()));
        }

        Ok(resolved)
    }
}

fn is_absolute_like(path: &str) -> bool {
    if path.starts_with('/') || path.starts_with('\\') {
        return true;
    }

    // Windows drive prefix ("C:..."), rejected on every platform
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        return true;
    }

    Path::new(path)
        .components()
        .any(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
}

/// Symlink hops followed through dangling links before giving up
const MAX_LINK_HOPS: usize = 40;

/// Canonicalize the deepest existing ancestor and re-append the missing tail
///
/// A dangling symlink does not count as missing: its target is followed, so
/// the containment check sees where a write through the link would land.
fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<OsString> = Vec::new();
    let mut hops = 0;

    loop {
        match existing.canonicalize() {
            Ok(mut resolved) => {
                for part in tail.iter().rev() {
                    resolved.push(part);
                }
                return Ok(resolved);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                if is_symlink(&existing) {
                    hops += 1;
                    if hops > MAX_LINK_HOPS {
                        return Err(io::Error::new(
                            io::ErrorKind::Other,
                            "too many levels of symbolic links",
                        ));
                    }
                    let target = std::fs::read_link(&existing)?;
                    existing = match existing.parent() {
                        Some(parent) => parent.join(target),
                        None => target,
                    };
                    continue;
                }

                let Some(name) = existing.file_name().map(|n| n.to_os_string()) else {
                    return Err(e);
                };
                tail.push(name);
                if !existing.pop() {
                    return Err(e);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_accepts_nested_relative_paths() {
        assert!(PathGuard::validate("src/App.tsx").is_ok());
        assert!(PathGuard::validate(".gitignore").is_ok());
        assert!(PathGuard::validate("./docs/setup.md").is_ok());
        assert!(PathGuard::validate("a..b/file..txt").is_ok());
    }

    #[test]
    fn test_validate_rejects_unsafe_paths() {
        assert_eq!(PathGuard::validate(""), Err(PathError::Empty));
        assert_eq!(PathGuard::validate("   "), Err(PathError::Empty));
        assert!(matches!(PathGuard::validate("/etc/passwd"), Err(PathError::Absolute(_))));
        assert!(matches!(PathGuard::validate("C:\\Windows"), Err(PathError::Absolute(_))));
        assert!(matches!(PathGuard::validate("\\\\server\\share"), Err(PathError::Absolute(_))));
        assert!(matches!(
            PathGuard::validate("../../etc/passwd"),
            Err(PathError::ParentSegment(_))
        ));
        assert!(matches!(
            PathGuard::validate("src/../../x"),
            Err(PathError::ParentSegment(_))
        ));
        assert!(matches!(
            PathGuard::validate("src\\..\\x"),
            Err(PathError::ParentSegment(_))
        ));
        assert_eq!(PathGuard::validate("a\0b"), Err(PathError::Nul));
    }

    #[test]
    fn test_resolve_missing_target_inside_base() {
        let temp = TempDir::new().unwrap();

        let resolved = PathGuard::resolve(temp.path(), "backend/app/main.py").unwrap();
        let base = temp.path().canonicalize().unwrap();

        assert!(resolved.starts_with(&base));
        assert!(resolved.ends_with("backend/app/main.py"));
    }

    #[test]
    fn test_resolve_rejects_base_itself() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            PathGuard::resolve(temp.path(), "."),
            Err(PathError::Escapes(_))
        ));
    }

    #[test]
    fn test_resolve_requires_existing_base() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        assert!(matches!(
            PathGuard::resolve(&missing, "file.txt"),
            Err(PathError::Unresolvable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let outside = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), base.path().join("link")).unwrap();

        let result = PathGuard::resolve(base.path(), "link/secret.txt");
        assert!(matches!(result, Err(PathError::Escapes(_))));
        assert!(result.unwrap_err().is_forbidden());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_dangling_symlink_escape() {
        let outside = TempDir::new().unwrap();
        let base = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path().join("pwned.txt"), base.path().join("link"))
            .unwrap();

        let result = PathGuard::resolve(base.path(), "link");
        assert!(matches!(result, Err(PathError::Escapes(_))));

        // Also as an intermediate directory component
        std::os::unix::fs::symlink(outside.path().join("gone"), base.path().join("dir")).unwrap();
        assert!(matches!(
            PathGuard::resolve(base.path(), "dir/nested/file.txt"),
            Err(PathError::Escapes(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_follows_dangling_symlink_inside_base() {
        let base = TempDir::new().unwrap();
        std::os::unix::fs::symlink("later.txt", base.path().join("alias.txt")).unwrap();

        let resolved = PathGuard::resolve(base.path(), "alias.txt").unwrap();
        assert_eq!(resolved, base.path().canonicalize().unwrap().join("later.txt"));
    }
}
