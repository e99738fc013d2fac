//! Directory tree enumeration and per-tree digest maps.
//!
//! [`enumerate`] walks a root (recursively or top-level only) and maps
//! root-relative paths, normalized to forward slashes, to absolute paths.
//! [`digest_tree`] turns that listing into a [`TreeDigestMap`].

mod digest_map;
mod enumerate;

use std::path::PathBuf;

pub use digest_map::{TreeDigestMap, digest_path, digest_tree};
pub use enumerate::{EnumerateOptions, enumerate, is_hidden, relative_key};

/// Errors produced while walking or digesting a tree.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Digest(#[from] xfercheck_digest::DigestError),
}

impl TreeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
