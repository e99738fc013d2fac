//! Local ↔ server path mapping.
//!
//! A transferred entry keeps its root-relative suffix on both sides; only
//! the root prefix differs.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xfercheck_tree::relative_key;

use crate::error::VerifyError;

/// Rebases `path` from `from_root` onto `to_root`.
///
/// Fails with [`VerifyError::OutsideRoot`] if `path` does not live under
/// `from_root`.
pub fn map_counterpart(path: &Path, from_root: &Path, to_root: &Path) -> Result<PathBuf, VerifyError> {
    let rel = path.strip_prefix(from_root).map_err(|_| VerifyError::OutsideRoot {
        path: path.to_path_buf(),
        root: from_root.to_path_buf(),
    })?;
    Ok(to_root.join(rel))
}

/// A local path and its expected server-side counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMapping {
    pub local: PathBuf,
    pub server: PathBuf,
    /// Suffix shared by both sides, `/`-separated.
    pub relative: String,
}

impl PathMapping {
    /// Builds the mapping for a new server-side entry.
    pub fn from_server(server_path: &Path, local_root: &Path, server_root: &Path) -> Result<Self, VerifyError> {
        let local = map_counterpart(server_path, server_root, local_root)?;
        Ok(Self {
            relative: rel(server_root, server_path)?,
            local,
            server: server_path.to_path_buf(),
        })
    }

    /// Builds the mapping for a local entry expected on the server.
    pub fn from_local(local_path: &Path, local_root: &Path, server_root: &Path) -> Result<Self, VerifyError> {
        let server = map_counterpart(local_path, local_root, server_root)?;
        Ok(Self {
            relative: rel(local_root, local_path)?,
            local: local_path.to_path_buf(),
            server,
        })
    }
}

fn rel(root: &Path, path: &Path) -> Result<String, VerifyError> {
    relative_key(root, path).ok_or_else(|| VerifyError::OutsideRoot {
        path: path.to_path_buf(),
        root: root.to_path_buf(),
    })
}

/// Structural comparison of the immediate sub-directories of two roots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryComparison {
    /// Directories only under the local root (absolute local paths).
    pub local_only: Vec<PathBuf>,
    /// Directories only under the server root (absolute server paths).
    pub server_only: Vec<PathBuf>,
    /// Names present on both sides.
    pub shared: Vec<String>,
}

/// Compares the child directories of `local_root` and `server_root`.
///
/// Hidden directories (starting with `.`) are ignored on both sides.
pub fn compare_directories(local_root: &Path, server_root: &Path) -> Result<DirectoryComparison, VerifyError> {
    let local = child_dirs(local_root)?;
    let server = child_dirs(server_root)?;

    Ok(DirectoryComparison {
        local_only: local.difference(&server).map(|n| local_root.join(n)).collect(),
        server_only: server.difference(&local).map(|n| server_root.join(n)).collect(),
        shared: local
            .intersection(&server)
            .map(|n| n.to_string_lossy().into_owned())
            .collect(),
    })
}

fn child_dirs(root: &Path) -> Result<BTreeSet<OsString>, VerifyError> {
    let entries = std::fs::read_dir(root).map_err(|e| VerifyError::io(root, e))?;

    let mut names = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| VerifyError::io(root, e))?;
        let file_type = entry.file_type().map_err(|e| VerifyError::io(entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }
        let name = entry.file_name();
        // Skip hidden directories.
        if name.to_string_lossy().starts_with('.') {
            continue;
        }
        names.insert(name);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn maps_between_roots() {
        let mapped = map_counterpart(
            Path::new("/local/data/x/y.txt"),
            Path::new("/local/data"),
            Path::new("/server/data"),
        )
        .unwrap();
        assert_eq!(mapped, PathBuf::from("/server/data/x/y.txt"));
    }

    #[test]
    fn outside_root_fails_loudly() {
        let result = map_counterpart(
            Path::new("/elsewhere/y.txt"),
            Path::new("/local/data"),
            Path::new("/server/data"),
        );
        assert!(matches!(result, Err(VerifyError::OutsideRoot { .. })));
    }

    #[test]
    fn sibling_with_common_string_prefix_is_outside() {
        // `/local/data2` shares a string prefix but not a path prefix.
        let result = map_counterpart(
            Path::new("/local/data2/y.txt"),
            Path::new("/local/data"),
            Path::new("/server/data"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn mapping_from_server_side() {
        let m = PathMapping::from_server(
            Path::new("/server/data/run1/a.bin"),
            Path::new("/local/data"),
            Path::new("/server/data"),
        )
        .unwrap();
        assert_eq!(m.local, PathBuf::from("/local/data/run1/a.bin"));
        assert_eq!(m.server, PathBuf::from("/server/data/run1/a.bin"));
        assert_eq!(m.relative, "run1/a.bin");
    }

    #[test]
    fn mapping_from_local_side() {
        let m = PathMapping::from_local(
            Path::new("/local/data/run2"),
            Path::new("/local/data"),
            Path::new("/server/data"),
        )
        .unwrap();
        assert_eq!(m.server, PathBuf::from("/server/data/run2"));
        assert_eq!(m.relative, "run2");
    }

    #[test]
    fn compare_directories_splits_sides() {
        let local = TempDir::new().unwrap();
        let server = TempDir::new().unwrap();

        for name in ["a", "b", "c", ".cache"] {
            fs::create_dir(local.path().join(name)).unwrap();
        }
        for name in ["a", "z"] {
            fs::create_dir(server.path().join(name)).unwrap();
        }
        fs::write(local.path().join("file.txt"), b"not a dir").unwrap();

        let cmp = compare_directories(local.path(), server.path()).unwrap();
        assert_eq!(cmp.local_only, vec![local.path().join("b"), local.path().join("c")]);
        assert_eq!(cmp.server_only, vec![server.path().join("z")]);
        assert_eq!(cmp.shared, vec!["a".to_string()]);
    }
}
