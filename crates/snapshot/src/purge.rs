//! Best-effort removal of newly created entries.

use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};

use crate::NewEntrySet;

/// Removes a file, symlink or directory tree.
///
/// A path that is already gone counts as removed.
pub fn remove_path(path: &Path) -> std::io::Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Unconditionally removes every entry of `set`.
///
/// Failures are logged and skipped so one bad entry does not stop the
/// batch. Returns the number of top-level entries removed.
pub fn purge(set: &NewEntrySet) -> usize {
    let mut removed = 0usize;
    for path in set.top_level() {
        match remove_path(&path) {
            Ok(()) => removed += 1,
            Err(e) => warn!(path = %path.display(), error = %e, "failed to purge entry"),
        }
    }

    if removed > 0 {
        info!(root = %set.root().display(), removed, "purged new entries");
    }
    removed
}
