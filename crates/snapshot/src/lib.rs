//! Directory snapshots and new-entry discovery.
//!
//! A [`Snapshot`] records which files (or directories) existed under a root
//! at a point in time. Diffing it against the same root later yields the
//! [`NewEntrySet`] of entries that appeared in between, independent of the
//! tool that created them.

mod purge;
mod snapshot;

use std::path::PathBuf;

pub use purge::{purge, remove_path};
pub use snapshot::{NewEntrySet, Snapshot, SnapshotKind};

/// Errors produced by snapshot capture, diffing and persistence.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("snapshot root mismatch: captured {}, diffed against {}", expected.display(), actual.display())]
    RootMismatch { expected: PathBuf, actual: PathBuf },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
