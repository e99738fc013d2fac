//! Confirmable, best-effort recursive deletion.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};
use xfercheck_snapshot::remove_path;

/// Yes/no decision source gating each deletion.
///
/// The CLI implements this with a terminal prompt; tests use closures.
pub trait ConfirmOracle: Send + Sync {
    /// Returns `true` if `path` may be deleted.
    fn confirm(&self, path: &Path) -> bool;
}

/// Approves every deletion.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl ConfirmOracle for AlwaysConfirm {
    fn confirm(&self, _path: &Path) -> bool {
        true
    }
}

/// Refuses every deletion.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl ConfirmOracle for NeverConfirm {
    fn confirm(&self, _path: &Path) -> bool {
        false
    }
}

impl<F> ConfirmOracle for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn confirm(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Deletes paths, optionally asking an oracle first.
///
/// Oracle calls are serialized, so prompts never interleave even when the
/// executor is shared between threads.
pub struct CleanupExecutor<'a> {
    oracle: &'a dyn ConfirmOracle,
    prompt: Mutex<()>,
}

impl<'a> CleanupExecutor<'a> {
    pub fn new(oracle: &'a dyn ConfirmOracle) -> Self {
        Self {
            oracle,
            prompt: Mutex::new(()),
        }
    }

    /// Removes each path recursively.
    ///
    /// With `confirm` set, a path is only removed after the oracle approves
    /// it. Paths that are already gone count as removed; other failures are
    /// logged and skipped. Returns the paths that no longer exist.
    pub fn remove(&self, paths: &[PathBuf], confirm: bool) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for path in paths {
            if confirm && !self.approve(path) {
                info!(path = %path.display(), "deletion declined");
                continue;
            }

            match remove_path(path) {
                Ok(()) => {
                    info!(path = %path.display(), "deleted");
                    removed.push(path.clone());
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to delete"),
            }
        }
        removed
    }

    fn approve(&self, path: &Path) -> bool {
        let _guard = self.prompt.lock().unwrap_or_else(|e| e.into_inner());
        self.oracle.confirm(path)
    }
}

/// Convenience wrapper around [`CleanupExecutor::remove`].
pub fn remove(paths: &[PathBuf], confirm: bool, oracle: &dyn ConfirmOracle) -> Vec<PathBuf> {
    CleanupExecutor::new(oracle).remove(paths, confirm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn make_targets(root: &Path) -> Vec<PathBuf> {
        let file = root.join("f2");
        fs::write(&file, b"BBX").unwrap();
        let dir = root.join("run1");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested").join("x.bin"), b"x").unwrap();
        vec![file, dir]
    }

    #[test]
    fn unconfirmed_removal_deletes_everything() {
        let tmp = TempDir::new().unwrap();
        let targets = make_targets(tmp.path());

        let removed = remove(&targets, false, &NeverConfirm);
        assert_eq!(removed, targets);
        assert!(targets.iter().all(|p| !p.exists()));
    }

    #[test]
    fn declined_paths_are_kept() {
        let tmp = TempDir::new().unwrap();
        let targets = make_targets(tmp.path());

        let removed = remove(&targets, true, &NeverConfirm);
        assert!(removed.is_empty());
        assert!(targets.iter().all(|p| p.exists()));
    }

    #[test]
    fn oracle_is_asked_once_per_path() {
        let tmp = TempDir::new().unwrap();
        let targets = make_targets(tmp.path());
        let asked = AtomicUsize::new(0);

        let oracle = |p: &Path| {
            asked.fetch_add(1, Ordering::SeqCst);
            p.file_name().is_some_and(|n| n == "run1")
        };
        let removed = remove(&targets, true, &oracle);

        assert_eq!(asked.load(Ordering::SeqCst), 2);
        assert_eq!(removed, vec![targets[1].clone()]);
        assert!(targets[0].exists());
        assert!(!targets[1].exists());
    }

    #[test]
    fn missing_paths_count_as_removed() {
        let tmp = TempDir::new().unwrap();
        let ghost = tmp.path().join("never-existed");
        let removed = remove(std::slice::from_ref(&ghost), false, &AlwaysConfirm);
        assert_eq!(removed, vec![ghost]);
    }

    #[test]
    fn prompts_do_not_interleave() {
        let tmp = TempDir::new().unwrap();
        let in_prompt = AtomicBool::new(false);
        let oracle = |_: &Path| {
            assert!(!in_prompt.swap(true, Ordering::SeqCst), "prompts overlapped");
            std::thread::sleep(std::time::Duration::from_millis(5));
            in_prompt.store(false, Ordering::SeqCst);
            false
        };
        let executor = CleanupExecutor::new(&oracle);

        std::thread::scope(|s| {
            for i in 0..4 {
                let path = tmp.path().join(format!("p{i}"));
                let executor = &executor;
                s.spawn(move || {
                    for _ in 0..5 {
                        executor.remove(std::slice::from_ref(&path), true);
                    }
                });
            }
        });
    }
}
