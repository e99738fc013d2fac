//! Data types for verification runs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use xfercheck_digest::DigestAlgorithm;
use xfercheck_snapshot::SnapshotKind;
use xfercheck_tree::EnumerateOptions;

/// Knobs for one verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOptions {
    #[serde(default)]
    pub algorithm: DigestAlgorithm,

    /// Digest directory pairs recursively.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Include dotfiles when digesting directory pairs.
    #[serde(default)]
    pub include_hidden: bool,

    /// Delete failed server paths after the run.
    #[serde(default)]
    pub rm_on_failure: bool,

    /// Ask the confirmation oracle before each deletion.
    #[serde(default = "default_true")]
    pub confirm_before_rm: bool,

    /// Files digested concurrently per side.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Abandon remaining pairs after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    crate::DEFAULT_WORKERS
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            algorithm: DigestAlgorithm::default(),
            recursive: default_true(),
            include_hidden: false,
            rm_on_failure: false,
            confirm_before_rm: default_true(),
            workers: default_workers(),
            timeout_secs: None,
        }
    }
}

impl VerifyOptions {
    pub fn enumerate_options(&self) -> EnumerateOptions {
        EnumerateOptions {
            recursive: self.recursive,
            include_hidden: self.include_hidden,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// How a [`crate::Verifier`] discovers what was transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineMode {
    /// Snapshot the server root now, diff it at verify time and map new
    /// server entries back to the local root.
    ServerSnapshot(SnapshotKind),
    /// Record the local directories missing on the server now, and map them
    /// onto the server root at verify time.
    TwoRoot,
}

impl Default for BaselineMode {
    fn default() -> Self {
        Self::ServerSnapshot(SnapshotKind::Files)
    }
}

/// Lifecycle of a [`crate::Verifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierState {
    /// Roots validated and baseline captured.
    Initialized,
    /// Re-snapshot, mapping and digesting in progress.
    Verifying,
    /// Verdict produced; terminal.
    Concluded,
}

/// Result for one local/server path pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairOutcome {
    /// Every file matched.
    Verified,
    /// Same file set, but some digests differ.
    Corrupt { mismatched: Vec<String> },
    /// The two sides hold different file sets.
    StructuralMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },
    /// Digesting failed (unreadable or vanished file).
    Failed { error: String },
}

impl PairOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// Per-pair report inside a [`VerificationVerdict`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairReport {
    pub local: PathBuf,
    pub server: PathBuf,
    pub relative: String,
    pub outcome: PairOutcome,
}

/// Outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    pub run_id: Uuid,
    pub algorithm: DigestAlgorithm,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Relative path → verified. Pairs that could not be compared file by
    /// file appear under their own relative path.
    pub files: BTreeMap<String, bool>,
    pub pairs: Vec<PairReport>,
    /// AND over every pair; `false` if the run was cancelled.
    pub transfer_ok: bool,
    /// Remaining pairs were abandoned.
    pub cancelled: bool,
    /// Server paths deleted by cleanup.
    pub removed: Vec<PathBuf>,
}

impl VerificationVerdict {
    /// Server paths of the pairs that did not verify.
    pub fn failed_server_paths(&self) -> Vec<PathBuf> {
        self.pairs
            .iter()
            .filter(|p| !p.outcome.is_verified())
            .map(|p| p.server.clone())
            .collect()
    }
}

/// Result of comparing two folders that should be identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderComparison {
    pub algorithm: DigestAlgorithm,
    pub files: BTreeMap<String, bool>,
    pub all_match: bool,
}

impl FolderComparison {
    pub fn mismatched(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(k, _)| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let opts = VerifyOptions::default();
        assert_eq!(opts.algorithm, DigestAlgorithm::Sha256);
        assert!(opts.recursive);
        assert!(!opts.include_hidden);
        assert!(!opts.rm_on_failure);
        assert!(opts.confirm_before_rm);
        assert_eq!(opts.workers, crate::DEFAULT_WORKERS);
        assert_eq!(opts.timeout(), None);
    }

    #[test]
    fn options_partial_json_uses_defaults() {
        let opts: VerifyOptions =
            serde_json::from_str(r#"{"algorithm":"md5","timeout_secs":30}"#).unwrap();
        assert_eq!(opts.algorithm, DigestAlgorithm::Md5);
        assert!(opts.recursive);
        assert_eq!(opts.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let json = serde_json::to_value(PairOutcome::Corrupt {
            mismatched: vec!["f2".into()],
        })
        .unwrap();
        assert_eq!(json["status"], "corrupt");
        assert_eq!(json["mismatched"][0], "f2");
    }
}
