//! Streaming file digests for transfer verification.
//!
//! Every digest is computed with its own hasher instance, selected through
//! the closed [`DigestAlgorithm`] enumeration. Files are read in
//! [`BLOCK_SIZE`] blocks so arbitrarily large files never have to fit in
//! memory.

mod algorithm;
mod engine;

use std::path::PathBuf;

pub use algorithm::{DigestAlgorithm, ParseAlgorithmError};
pub use engine::{FileDigest, digest_bytes, digest_file, digest_reader};

/// Read block size used when streaming files: 16 KiB.
pub const BLOCK_SIZE: usize = 16 * 1024;

/// Errors produced while digesting files.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("is a directory: {}", .0.display())]
    IsADirectory(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotARegularFile(PathBuf),
}

impl DigestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
