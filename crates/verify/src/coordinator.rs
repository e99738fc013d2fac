//! Reconciliation of a finished transfer.
//!
//! A [`Verifier`] is created before the transfer runs, capturing the
//! "before" context. After the transfer, [`Verifier::verify`] discovers the
//! transferred paths, digests both sides of every pair, compares them and
//! aggregates a [`VerificationVerdict`]. Failed server paths can then be
//! rolled back through the [`ConfirmOracle`].

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;
use xfercheck_snapshot::{Snapshot, SnapshotKind};

use crate::cleanup::{CleanupExecutor, ConfirmOracle};
use crate::compare::compare_maps;
use crate::digester::digest_side;
use crate::error::VerifyError;
use crate::mapping::{PathMapping, compare_directories};
use crate::types::{
    BaselineMode, PairOutcome, PairReport, VerificationVerdict, VerifierState, VerifyOptions,
};

/// Callback invoked with each pair report as soon as it is recorded.
pub type PairCallback = Box<dyn Fn(&PairReport) + Send + Sync>;

enum Baseline {
    Snapshot(Snapshot),
    LocalOnly(Vec<PathBuf>),
}

/// Verifies one transfer between a local root and a server root.
pub struct Verifier {
    local_root: PathBuf,
    server_root: PathBuf,
    baseline: Baseline,
    state: VerifierState,
    callbacks: Vec<PairCallback>,
}

impl Verifier {
    /// Validates both roots and captures the baseline.
    ///
    /// Must be called before the transfer starts.
    pub fn new(local_root: &Path, server_root: &Path, mode: BaselineMode) -> Result<Self, VerifyError> {
        ensure_dir(local_root)?;
        ensure_dir(server_root)?;

        let baseline = match mode {
            BaselineMode::ServerSnapshot(kind) => {
                Baseline::Snapshot(Snapshot::capture(server_root, kind)?)
            }
            BaselineMode::TwoRoot => {
                let cmp = compare_directories(local_root, server_root)?;
                Baseline::LocalOnly(cmp.local_only)
            }
        };

        info!(
            local = %local_root.display(),
            server = %server_root.display(),
            ?mode,
            "verifier initialized"
        );

        Ok(Self {
            local_root: local_root.to_path_buf(),
            server_root: server_root.to_path_buf(),
            baseline,
            state: VerifierState::Initialized,
            callbacks: Vec::new(),
        })
    }

    /// Resumes from a server snapshot captured earlier, e.g. loaded from disk.
    pub fn from_snapshot(local_root: &Path, snapshot: Snapshot) -> Result<Self, VerifyError> {
        ensure_dir(local_root)?;
        ensure_dir(snapshot.root())?;

        Ok(Self {
            local_root: local_root.to_path_buf(),
            server_root: snapshot.root().to_path_buf(),
            baseline: Baseline::Snapshot(snapshot),
            state: VerifierState::Initialized,
            callbacks: Vec::new(),
        })
    }

    /// Registers a callback for per-pair progress.
    pub fn on_pair(&mut self, callback: impl Fn(&PairReport) + Send + Sync + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn state(&self) -> VerifierState {
        self.state
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn server_root(&self) -> &Path {
        &self.server_root
    }

    /// Discovers the path pairs produced by the transfer.
    pub fn discover(&self) -> Result<Vec<PathMapping>, VerifyError> {
        match &self.baseline {
            Baseline::Snapshot(snapshot) => {
                let new = snapshot.diff(&self.server_root)?;
                let entries: Vec<PathBuf> = match new.kind() {
                    SnapshotKind::Files => new.iter().map(Path::to_path_buf).collect(),
                    SnapshotKind::Directories => new.top_level(),
                };
                entries
                    .iter()
                    .map(|p| PathMapping::from_server(p, &self.local_root, &self.server_root))
                    .collect()
            }
            Baseline::LocalOnly(dirs) => dirs
                .iter()
                .map(|p| PathMapping::from_local(p, &self.local_root, &self.server_root))
                .collect(),
        }
    }

    /// Runs the verification.
    ///
    /// Pairs are evaluated one after another; a pair that fails to digest or
    /// has a different file set on each side is recorded and the run moves
    /// on. Cancelling `cancel`, or exceeding the configured timeout,
    /// abandons the remaining pairs while keeping the recorded ones.
    ///
    /// When the transfer did not verify and `rm_on_failure` is set, the
    /// server paths of the failed pairs are deleted, each confirmed through
    /// `oracle` if `confirm_before_rm` is set. A cancelled run never deletes.
    pub async fn verify(
        &mut self,
        options: &VerifyOptions,
        oracle: &dyn ConfirmOracle,
        cancel: CancellationToken,
    ) -> Result<VerificationVerdict, VerifyError> {
        if self.state != VerifierState::Initialized {
            return Err(VerifyError::AlreadyConcluded);
        }

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let deadline = options.timeout().map(|t| Instant::now() + t);

        // A failed re-snapshot leaves the verifier retryable.
        let pairs = self.discover()?;
        self.state = VerifierState::Verifying;
        if pairs.is_empty() {
            warn!(%run_id, server = %self.server_root.display(), "no transferred paths discovered");
        }
        info!(%run_id, pairs = pairs.len(), algorithm = %options.algorithm, "verification started");

        let mut reports = Vec::with_capacity(pairs.len());
        let mut files = BTreeMap::new();
        let mut cancelled = false;

        for mapping in pairs {
            if cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                cancelled = true;
                break;
            }

            let (outcome, pair_files) =
                match until_stopped(&cancel, deadline, verify_pair(&mapping, options)).await {
                    Ok(result) => result,
                    Err(Stopped::TimedOut) => {
                        warn!(%run_id, "verification timed out");
                        cancelled = true;
                        break;
                    }
                    Err(Stopped::Cancelled) => {
                        cancelled = true;
                        break;
                    }
                };

            log_outcome(&run_id, &mapping, &outcome);
            files.extend(pair_files);
            let report = PairReport {
                local: mapping.local,
                server: mapping.server,
                relative: mapping.relative,
                outcome,
            };
            for callback in &self.callbacks {
                callback(&report);
            }
            reports.push(report);
        }

        if cancelled {
            warn!(%run_id, completed = reports.len(), "verification cancelled, remaining pairs abandoned");
        }

        let transfer_ok = !cancelled && reports.iter().all(|r| r.outcome.is_verified());

        let mut verdict = VerificationVerdict {
            run_id,
            algorithm: options.algorithm,
            started_at,
            finished_at: Utc::now(),
            files,
            pairs: reports,
            transfer_ok,
            cancelled,
            removed: Vec::new(),
        };

        if !transfer_ok && !cancelled && options.rm_on_failure {
            let failed = verdict.failed_server_paths();
            info!(%run_id, paths = failed.len(), "removing failed server paths");
            verdict.removed = CleanupExecutor::new(oracle).remove(&failed, options.confirm_before_rm);
        }

        self.state = VerifierState::Concluded;
        info!(
            %run_id,
            transfer_ok,
            pairs = verdict.pairs.len(),
            removed = verdict.removed.len(),
            "verification concluded"
        );
        Ok(verdict)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Stopped {
    Cancelled,
    TimedOut,
}

/// Runs `work` unless `cancel` fires or `deadline` passes first.
///
/// Cancellation is checked before the deadline, and both before `work`.
async fn until_stopped<T>(
    cancel: &CancellationToken,
    deadline: Option<Instant>,
    work: impl Future<Output = T>,
) -> Result<T, Stopped> {
    let timed_out = async {
        match deadline {
            Some(d) => tokio::time::sleep_until(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Stopped::Cancelled),
        _ = timed_out => Err(Stopped::TimedOut),
        result = work => Ok(result),
    }
}

/// Digests both sides of one pair and compares them.
///
/// Returns the outcome plus the per-file verdict entries, keyed by the
/// pair's relative path.
async fn verify_pair(mapping: &PathMapping, options: &VerifyOptions) -> (PairOutcome, BTreeMap<String, bool>) {
    let whole_pair_failed = |outcome: PairOutcome| {
        let files = BTreeMap::from([(mapping.relative.clone(), false)]);
        (outcome, files)
    };

    let local_is_dir = match tokio::fs::metadata(&mapping.local).await {
        Ok(m) => m.is_dir(),
        Err(e) => {
            let error = VerifyError::io(&mapping.local, e).to_string();
            return whole_pair_failed(PairOutcome::Failed { error });
        }
    };

    let enumerate = options.enumerate_options();
    let digests = tokio::try_join!(
        digest_side(&mapping.local, enumerate, options.algorithm, options.workers),
        digest_side(&mapping.server, enumerate, options.algorithm, options.workers),
    );
    let (local_map, server_map) = match digests {
        Ok(maps) => maps,
        Err(e) => {
            return whole_pair_failed(PairOutcome::Failed {
                error: e.to_string(),
            });
        }
    };

    let results = match compare_maps(&local_map, &server_map, &mapping.local, &mapping.server) {
        Ok(results) => results,
        Err(VerifyError::StructuralMismatch {
            missing,
            unexpected,
            ..
        }) => {
            return whole_pair_failed(PairOutcome::StructuralMismatch {
                missing,
                unexpected,
            });
        }
        Err(e) => {
            return whole_pair_failed(PairOutcome::Failed {
                error: e.to_string(),
            });
        }
    };

    let files: BTreeMap<String, bool> = results
        .into_iter()
        .map(|(key, ok)| {
            let key = if local_is_dir {
                join_key(&mapping.relative, &key)
            } else {
                mapping.relative.clone()
            };
            (key, ok)
        })
        .collect();

    let mismatched: Vec<String> = files
        .iter()
        .filter(|(_, ok)| !**ok)
        .map(|(k, _)| k.clone())
        .collect();
    let outcome = if mismatched.is_empty() {
        PairOutcome::Verified
    } else {
        PairOutcome::Corrupt { mismatched }
    };
    (outcome, files)
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}/{key}")
    }
}

fn log_outcome(run_id: &Uuid, mapping: &PathMapping, outcome: &PairOutcome) {
    match outcome {
        PairOutcome::Verified => {
            info!(%run_id, path = %mapping.relative, "verified");
        }
        PairOutcome::Corrupt { mismatched } => {
            warn!(%run_id, path = %mapping.relative, mismatched = mismatched.len(), "checksum mismatch");
        }
        PairOutcome::StructuralMismatch {
            missing,
            unexpected,
        } => {
            warn!(
                %run_id,
                path = %mapping.relative,
                missing = missing.len(),
                unexpected = unexpected.len(),
                "file sets differ"
            );
        }
        PairOutcome::Failed { error } => {
            warn!(%run_id, path = %mapping.relative, %error, "pair could not be verified");
        }
    }
}

fn ensure_dir(path: &Path) -> Result<(), VerifyError> {
    if std::fs::metadata(path).is_ok_and(|m| m.is_dir()) {
        Ok(())
    } else {
        Err(VerifyError::NotADirectory(path.to_path_buf()))
    }
}
