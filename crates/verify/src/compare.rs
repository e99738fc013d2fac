//! Digest-map comparison and standalone folder comparison.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};
use xfercheck_tree::TreeDigestMap;

use crate::digester::digest_side;
use crate::error::VerifyError;
use crate::types::{FolderComparison, VerifyOptions};

/// Compares two digest maps file by file.
///
/// The key sets must be identical; otherwise the comparison fails with
/// [`VerifyError::StructuralMismatch`] instead of producing a partial
/// verdict. On success returns key → digests equal.
pub fn compare_maps(
    local: &TreeDigestMap,
    server: &TreeDigestMap,
    local_path: &Path,
    server_path: &Path,
) -> Result<BTreeMap<String, bool>, VerifyError> {
    let (missing, unexpected) = local.key_difference(server);
    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(VerifyError::StructuralMismatch {
            local: local_path.to_path_buf(),
            server: server_path.to_path_buf(),
            missing,
            unexpected,
        });
    }

    let mut results = BTreeMap::new();
    for (key, expected) in local.iter() {
        let ok = server.get(key).is_some_and(|actual| expected.matches(actual));
        if !ok {
            warn!(file = key, "checksum does not match");
        }
        results.insert(key.to_string(), ok);
    }
    Ok(results)
}

/// Compares two folders that should hold identical content.
pub async fn compare_folders(
    folder_a: &Path,
    folder_b: &Path,
    options: &VerifyOptions,
) -> Result<FolderComparison, VerifyError> {
    for folder in [folder_a, folder_b] {
        if !tokio::fs::metadata(folder).await.is_ok_and(|m| m.is_dir()) {
            return Err(VerifyError::NotADirectory(folder.to_path_buf()));
        }
    }

    let enumerate = options.enumerate_options();
    let (map_a, map_b) = tokio::try_join!(
        digest_side(folder_a, enumerate, options.algorithm, options.workers),
        digest_side(folder_b, enumerate, options.algorithm, options.workers),
    )?;

    let files = compare_maps(&map_a, &map_b, folder_a, folder_b)?;
    let all_match = files.values().all(|ok| *ok);
    info!(
        a = %folder_a.display(),
        b = %folder_b.display(),
        files = files.len(),
        all_match,
        "compared folders"
    );

    Ok(FolderComparison {
        algorithm: options.algorithm,
        files,
        all_match,
    })
}
