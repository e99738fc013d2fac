use std::io::{ErrorKind, Read};
use std::path::Path;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::{BLOCK_SIZE, DigestAlgorithm, DigestError};

/// Digest of a single file, keyed by its root-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    /// Root-relative path, `/`-separated.
    pub relative_path: String,
    /// Lowercase hex digest.
    pub hex_digest: String,
    pub algorithm: DigestAlgorithm,
}

impl FileDigest {
    /// Digests `path` and records it under `relative_path`.
    pub fn compute(
        relative_path: impl Into<String>,
        path: &Path,
        algorithm: DigestAlgorithm,
    ) -> Result<Self, DigestError> {
        Ok(Self {
            relative_path: relative_path.into(),
            hex_digest: digest_file(path, algorithm)?,
            algorithm,
        })
    }

    /// Returns `true` if both digests were produced by the same algorithm
    /// and have identical content fingerprints.
    pub fn matches(&self, other: &FileDigest) -> bool {
        self.algorithm == other.algorithm && self.hex_digest == other.hex_digest
    }
}

// ---------------------------------------------------------------------------
// Digest helpers
// ---------------------------------------------------------------------------

/// Computes the digest of `data` and returns it hex-encoded.
pub fn digest_bytes(data: &[u8], algorithm: DigestAlgorithm) -> String {
    match algorithm {
        DigestAlgorithm::Md5 => hex::encode(Md5::digest(data)),
        DigestAlgorithm::Sha1 => hex::encode(Sha1::digest(data)),
        DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
    }
}

/// Streams `reader` to end-of-stream through a fresh hasher.
pub fn digest_reader<R: Read>(reader: &mut R, algorithm: DigestAlgorithm) -> std::io::Result<String> {
    match algorithm {
        DigestAlgorithm::Md5 => stream::<Md5, R>(reader),
        DigestAlgorithm::Sha1 => stream::<Sha1, R>(reader),
        DigestAlgorithm::Sha256 => stream::<Sha256, R>(reader),
    }
}

/// Computes the digest of an entire file.
///
/// Only the byte content is hashed; timestamps and permissions never
/// influence the result. The type is checked before opening, so FIFOs and
/// device nodes are rejected instead of blocking the reader.
pub fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> Result<String, DigestError> {
    let metadata = std::fs::metadata(path).map_err(|e| DigestError::io(path, e))?;
    if metadata.is_dir() {
        return Err(DigestError::IsADirectory(path.to_path_buf()));
    }
    if !metadata.is_file() {
        return Err(DigestError::NotARegularFile(path.to_path_buf()));
    }

    let mut file = std::fs::File::open(path).map_err(|e| DigestError::io(path, e))?;

    let hex = digest_reader(&mut file, algorithm).map_err(|e| DigestError::io(path, e))?;
    tracing::debug!(path = %path.display(), %algorithm, digest = %hex, "digested file");
    Ok(hex)
}

fn stream<D: Digest, R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; BLOCK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
