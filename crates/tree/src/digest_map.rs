use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use xfercheck_digest::{DigestAlgorithm, FileDigest};

use crate::TreeError;
use crate::enumerate::{EnumerateOptions, enumerate};

/// Digests of every file in one tree, keyed by root-relative path.
///
/// Built once per tree per verification pass; there is no API to update
/// an existing map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDigestMap {
    entries: BTreeMap<String, FileDigest>,
}

impl TreeDigestMap {
    /// Collects digests into a map keyed by their relative paths.
    pub fn from_digests(digests: impl IntoIterator<Item = FileDigest>) -> Self {
        Self {
            entries: digests
                .into_iter()
                .map(|d| (d.relative_path.clone(), d))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FileDigest> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileDigest)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Compares key sets.
    ///
    /// Returns `(missing, unexpected)`: keys present here but absent from
    /// `other`, and keys present in `other` but absent here.
    pub fn key_difference(&self, other: &TreeDigestMap) -> (Vec<String>, Vec<String>) {
        let missing = self
            .entries
            .keys()
            .filter(|k| !other.entries.contains_key(*k))
            .cloned()
            .collect();
        let unexpected = other
            .entries
            .keys()
            .filter(|k| !self.entries.contains_key(*k))
            .cloned()
            .collect();
        (missing, unexpected)
    }
}

/// Enumerates `root` and digests every file, one fresh hasher per file.
pub fn digest_tree(
    root: &Path,
    options: EnumerateOptions,
    algorithm: DigestAlgorithm,
) -> Result<TreeDigestMap, TreeError> {
    let files = enumerate(root, options)?;
    let mut digests = Vec::with_capacity(files.len());
    for (key, path) in files {
        digests.push(FileDigest::compute(key, &path, algorithm)?);
    }
    Ok(TreeDigestMap::from_digests(digests))
}

/// Digests a single file or a whole directory.
///
/// A regular file yields a one-entry map keyed by its file name.
pub fn digest_path(
    path: &Path,
    options: EnumerateOptions,
    algorithm: DigestAlgorithm,
) -> Result<TreeDigestMap, TreeError> {
    let metadata = std::fs::metadata(path).map_err(|e| TreeError::io(path, e))?;
    if metadata.is_dir() {
        return digest_tree(path, options, algorithm);
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let digest = FileDigest::compute(name, path, algorithm)?;
    Ok(TreeDigestMap::from_digests([digest]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn digest_tree_covers_all_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("f1"), b"AAA").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("f2"), b"BBB").unwrap();

        let map = digest_tree(dir.path(), EnumerateOptions::default(), DigestAlgorithm::Md5)
            .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["f1", "sub/f2"]);
        assert_eq!(
            map.get("f1").unwrap().hex_digest,
            xfercheck_digest::digest_bytes(b"AAA", DigestAlgorithm::Md5)
        );
    }

    #[test]
    fn identical_trees_produce_equal_maps() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        for root in [a.path(), b.path()] {
            fs::create_dir_all(root.join("x")).unwrap();
            fs::write(root.join("x").join("y.txt"), b"payload").unwrap();
        }

        let opts = EnumerateOptions::default();
        let ma = digest_tree(a.path(), opts, DigestAlgorithm::Sha256).unwrap();
        let mb = digest_tree(b.path(), opts, DigestAlgorithm::Sha256).unwrap();
        assert_eq!(ma, mb);
    }

    #[test]
    fn key_difference_reports_both_directions() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("x.txt"), b"x").unwrap();
        fs::write(a.path().join("y.txt"), b"y").unwrap();
        fs::write(b.path().join("x.txt"), b"x").unwrap();
        fs::write(b.path().join("z.txt"), b"z").unwrap();

        let opts = EnumerateOptions::default();
        let ma = digest_tree(a.path(), opts, DigestAlgorithm::Sha1).unwrap();
        let mb = digest_tree(b.path(), opts, DigestAlgorithm::Sha1).unwrap();

        let (missing, unexpected) = ma.key_difference(&mb);
        assert_eq!(missing, vec!["y.txt".to_string()]);
        assert_eq!(unexpected, vec!["z.txt".to_string()]);
    }

    #[test]
    fn digest_path_on_file_uses_file_name() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("report.csv");
        fs::write(&file, b"1,2,3").unwrap();

        let map = digest_path(&file, EnumerateOptions::default(), DigestAlgorithm::Sha256).unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["report.csv"]);
    }

    #[test]
    fn digest_path_missing_is_io_error() {
        let result = digest_path(
            Path::new("/nonexistent/thing"),
            EnumerateOptions::default(),
            DigestAlgorithm::Sha256,
        );
        assert!(matches!(result, Err(TreeError::Io { .. })));
    }
}
