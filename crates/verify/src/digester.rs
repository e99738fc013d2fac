//! Bounded parallel digesting of one side of a path pair.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;
use xfercheck_digest::{DigestAlgorithm, DigestError, FileDigest};
use xfercheck_tree::{EnumerateOptions, TreeDigestMap, enumerate};

use crate::error::VerifyError;

/// Digests a file or directory with at most `workers` files in flight.
///
/// A regular file yields a one-entry map keyed by its file name; any other
/// non-directory (FIFO, socket, device) is rejected without being opened.
/// Each job builds its own hasher; nothing is shared between files.
pub async fn digest_side(
    path: &Path,
    options: EnumerateOptions,
    algorithm: DigestAlgorithm,
    workers: usize,
) -> Result<TreeDigestMap, VerifyError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| VerifyError::io(path, e))?;

    if !metadata.is_dir() {
        if !metadata.is_file() {
            warn!(path = %path.display(), "not a regular file, refusing to digest");
            return Err(DigestError::NotARegularFile(path.to_path_buf()).into());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = path.to_path_buf();
        let digest =
            tokio::task::spawn_blocking(move || FileDigest::compute(name, &file, algorithm))
                .await??;
        return Ok(TreeDigestMap::from_digests([digest]));
    }

    let root = path.to_path_buf();
    let files = tokio::task::spawn_blocking(move || enumerate(&root, options)).await??;

    let permits = Arc::new(Semaphore::new(workers.max(1)));
    let mut jobs = JoinSet::new();
    for (key, file) in files {
        let permit = permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| VerifyError::Join(e.to_string()))?;
        jobs.spawn_blocking(move || {
            let result = FileDigest::compute(key, &file, algorithm);
            drop(permit);
            result
        });
    }

    let mut digests = Vec::new();
    while let Some(joined) = jobs.join_next().await {
        digests.push(joined??);
    }
    Ok(TreeDigestMap::from_digests(digests))
}
