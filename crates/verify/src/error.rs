//! Verification error types.

use std::path::PathBuf;

/// Errors produced while setting up or running a verification.
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "structural mismatch between {} and {}: {} missing, {} unexpected",
        local.display(),
        server.display(),
        missing.len(),
        unexpected.len()
    )]
    StructuralMismatch {
        local: PathBuf,
        server: PathBuf,
        /// Present locally, absent on the server.
        missing: Vec<String>,
        /// Present on the server, absent locally.
        unexpected: Vec<String>,
    },

    #[error("{} is not under root {}", path.display(), root.display())]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("verification already ran")]
    AlreadyConcluded,

    #[error("digest task failed: {0}")]
    Join(String),

    #[error(transparent)]
    Digest(#[from] xfercheck_digest::DigestError),

    #[error(transparent)]
    Tree(#[from] xfercheck_tree::TreeError),

    #[error(transparent)]
    Snapshot(#[from] xfercheck_snapshot::SnapshotError),
}

impl VerifyError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<tokio::task::JoinError> for VerifyError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Join(e.to_string())
    }
}
