use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::SnapshotError;

/// Which kind of filesystem entry a snapshot tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Every regular file, or symlink to one, in the subtree.
    #[default]
    Files,
    /// Every directory in the subtree, excluding the root itself.
    Directories,
}

/// The set of entries under a root at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    root: PathBuf,
    kind: SnapshotKind,
    entries: BTreeSet<PathBuf>,
    captured_at: DateTime<Utc>,
}

impl Snapshot {
    /// Captures the current recursive set of `kind` entries under `root`.
    pub fn capture(root: &Path, kind: SnapshotKind) -> Result<Self, SnapshotError> {
        let entries = scan(root, kind)?;
        debug!(root = %root.display(), ?kind, entries = entries.len(), "captured snapshot");
        Ok(Self {
            root: root.to_path_buf(),
            kind,
            entries,
            captured_at: Utc::now(),
        })
    }

    /// Re-captures `root` and returns the entries absent from this snapshot.
    ///
    /// The difference is always taken against this baseline: an entry that
    /// was renamed shows up only under its new name, and entries that
    /// appeared and vanished again between captures are not reported.
    pub fn diff(&self, root: &Path) -> Result<NewEntrySet, SnapshotError> {
        if root != self.root {
            return Err(SnapshotError::RootMismatch {
                expected: self.root.clone(),
                actual: root.to_path_buf(),
            });
        }

        let current = scan(root, self.kind)?;
        let entries: BTreeSet<PathBuf> = current.difference(&self.entries).cloned().collect();
        info!(root = %root.display(), new_entries = entries.len(), "diffed snapshot");

        Ok(NewEntrySet {
            root: self.root.clone(),
            kind: self.kind,
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind(&self) -> SnapshotKind {
        self.kind
    }

    pub fn entries(&self) -> &BTreeSet<PathBuf> {
        &self.entries
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Writes the snapshot as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SnapshotError::io(parent, e))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| SnapshotError::io(path, e))?;
        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }

    /// Reads a snapshot previously written by [`Snapshot::save`].
    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Entries present in a later capture but absent from the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEntrySet {
    root: PathBuf,
    kind: SnapshotKind,
    entries: BTreeSet<PathBuf>,
}

impl NewEntrySet {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind(&self) -> SnapshotKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }

    /// Entries that have no ancestor in the set.
    ///
    /// For a directory snapshot this collapses a newly created tree into its
    /// topmost directory.
    pub fn top_level(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter(|p| !p.ancestors().skip(1).any(|a| self.entries.contains(a)))
            .cloned()
            .collect()
    }
}

fn scan(root: &Path, kind: SnapshotKind) -> Result<BTreeSet<PathBuf>, SnapshotError> {
    let metadata = std::fs::metadata(root).map_err(|e| SnapshotError::io(root, e))?;
    if !metadata.is_dir() {
        return Err(SnapshotError::NotADirectory(root.to_path_buf()));
    }

    let mut entries = BTreeSet::new();
    walk(root, kind, &mut entries)?;
    Ok(entries)
}

fn walk(current: &Path, kind: SnapshotKind, entries: &mut BTreeSet<PathBuf>) -> Result<(), SnapshotError> {
    let dir = std::fs::read_dir(current).map_err(|e| SnapshotError::io(current, e))?;

    for entry in dir {
        let entry = entry.map_err(|e| SnapshotError::io(current, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| SnapshotError::io(&path, e))?;

        if file_type.is_dir() {
            walk(&path, kind, entries)?;
            if kind == SnapshotKind::Directories {
                entries.insert(path);
            }
        } else if kind == SnapshotKind::Files && is_regular_file(&path, file_type) {
            entries.insert(path);
        }
    }

    Ok(())
}

/// Regular files, and symlinks resolving to one. FIFOs, sockets and device
/// nodes are never tracked: opening them for reading can block.
fn is_regular_file(path: &Path, file_type: std::fs::FileType) -> bool {
    if file_type.is_symlink() {
        std::fs::metadata(path).is_ok_and(|m| m.is_file())
    } else {
        file_type.is_file()
    }
}
