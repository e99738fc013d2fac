//! File enumeration for digesting.
//!
//! Produces a map from root-relative path (always `/`-separated, even on
//! Windows) to absolute path. Keys are unique because filesystem paths are.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::TreeError;

/// Controls what [`enumerate`] includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerateOptions {
    /// Walk the whole subtree instead of only the direct children.
    pub recursive: bool,
    /// Include entries whose name starts with `.`.
    pub include_hidden: bool,
}

impl Default for EnumerateOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            include_hidden: false,
        }
    }
}

/// Returns `true` if the final component of `path` starts with `.`.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Computes the `/`-separated key of `path` relative to `root`.
///
/// Returns `None` if `root` is not a prefix of `path`.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Lists the regular files under `root`.
///
/// In non-recursive mode sub-directories are skipped with a warning rather
/// than treated as an error. Directories are never part of the result.
/// Symbolic links are not followed into directories; a link to a regular
/// file is listed like the file itself.
pub fn enumerate(
    root: &Path,
    options: EnumerateOptions,
) -> Result<BTreeMap<String, PathBuf>, TreeError> {
    let metadata = std::fs::metadata(root).map_err(|e| TreeError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(TreeError::NotADirectory(root.to_path_buf()));
    }

    let mut files = BTreeMap::new();
    walk_dir(root, root, options, &mut files)?;
    debug!(root = %root.display(), files = files.len(), "enumerated tree");
    Ok(files)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    options: EnumerateOptions,
    files: &mut BTreeMap<String, PathBuf>,
) -> Result<(), TreeError> {
    let entries = std::fs::read_dir(current).map_err(|e| TreeError::io(current, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| TreeError::io(current, e))?;
        let path = entry.path();

        if !options.include_hidden && is_hidden(&path) {
            debug!(path = %path.display(), "skipping hidden entry");
            continue;
        }

        let file_type = entry.file_type().map_err(|e| TreeError::io(&path, e))?;

        if file_type.is_dir() {
            if options.recursive {
                walk_dir(root, &path, options, files)?;
            } else {
                warn!(path = %path.display(), "is a directory, skipping");
            }
            continue;
        }

        let is_file = if file_type.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(target) => target.is_file(),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "dangling symlink, skipping");
                    false
                }
            }
        } else {
            file_type.is_file()
        };

        if !is_file {
            continue;
        }

        let key = relative_key(root, &path).ok_or_else(|| {
            TreeError::io(&path, std::io::Error::other("entry escaped its root"))
        })?;
        files.insert(key, path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::write(root.join("f1.txt"), b"AAA").unwrap();
        fs::write(root.join(".hidden"), b"H").unwrap();

        fs::create_dir_all(root.join("data").join("levels")).unwrap();
        fs::write(root.join("data").join("config.ini"), b"CFG").unwrap();
        fs::write(root.join("data").join("levels").join("level1.dat"), b"L1").unwrap();

        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git").join("HEAD"), b"ref").unwrap();

        dir
    }

    fn keys(map: &BTreeMap<String, PathBuf>) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn recursive_lists_nested_files_with_forward_slashes() {
        let dir = create_test_tree();
        let files = enumerate(dir.path(), EnumerateOptions::default()).unwrap();

        assert_eq!(
            keys(&files),
            vec!["data/config.ini", "data/levels/level1.dat", "f1.txt"]
        );
        assert_eq!(files["f1.txt"], dir.path().join("f1.txt"));
    }

    #[test]
    fn include_hidden_adds_dotfiles_and_dot_directories() {
        let dir = create_test_tree();
        let options = EnumerateOptions {
            recursive: true,
            include_hidden: true,
        };
        let files = enumerate(dir.path(), options).unwrap();

        assert!(files.contains_key(".hidden"));
        assert!(files.contains_key(".git/HEAD"));
        assert_eq!(files.len(), 5);
    }

    #[test]
    fn non_recursive_skips_directories() {
        let dir = create_test_tree();
        let options = EnumerateOptions {
            recursive: false,
            include_hidden: false,
        };
        let files = enumerate(dir.path(), options).unwrap();
        assert_eq!(keys(&files), vec!["f1.txt"]);
    }

    #[test]
    fn empty_dir_yields_empty_map() {
        let dir = TempDir::new().unwrap();
        let files = enumerate(dir.path(), EnumerateOptions::default()).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn nonexistent_root_is_io_error() {
        let result = enumerate(
            Path::new("/nonexistent/path/that/does/not/exist"),
            EnumerateOptions::default(),
        );
        assert!(matches!(result, Err(TreeError::Io { .. })));
    }

    #[test]
    fn file_root_is_not_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, b"x").unwrap();

        let result = enumerate(&file, EnumerateOptions::default());
        assert!(matches!(result, Err(TreeError::NotADirectory(_))));
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), b"S").unwrap();
        fs::write(dir.path().join("real.txt"), b"R").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("alias.txt"))
            .unwrap();

        let files = enumerate(dir.path(), EnumerateOptions::default()).unwrap();
        assert_eq!(keys(&files), vec!["alias.txt", "real.txt"]);
    }

    #[test]
    fn relative_key_normalizes_and_rejects_foreign_paths() {
        let root = Path::new("/local/data");
        assert_eq!(
            relative_key(root, Path::new("/local/data/x/y.txt")).as_deref(),
            Some("x/y.txt")
        );
        assert_eq!(relative_key(root, Path::new("/other/y.txt")), None);
    }

    #[test]
    fn hidden_detection_uses_final_component() {
        assert!(is_hidden(Path::new("/a/b/.env")));
        assert!(!is_hidden(Path::new("/a/.b/c.txt")));
    }
}
