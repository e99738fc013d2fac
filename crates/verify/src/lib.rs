//! Transfer verification: discover what a transfer created, digest both
//! sides, compare, and roll back on failure.
//!
//! This crate holds the reconciliation logic only. It does not perform or
//! retry transfers; the caller runs its own copy tool between creating a
//! [`Verifier`] and calling [`Verifier::verify`].
//!
//! # Pipeline
//!
//! 1. **Baseline**: snapshot the server root (or record local-only directories)
//! 2. **Discover**: diff the server root against the baseline
//! 3. **Map**: pair every new entry with its local counterpart
//! 4. **Digest**: hash both sides of each pair, one fresh hasher per file
//! 5. **Compare**: require identical file sets, then equal digests
//! 6. **Cleanup**: optionally delete failed server paths, confirmed per path

pub mod cleanup;
pub mod compare;
pub mod coordinator;
pub mod digester;
pub mod error;
pub mod mapping;
pub mod types;

pub use cleanup::{AlwaysConfirm, CleanupExecutor, ConfirmOracle, NeverConfirm, remove};
pub use compare::{compare_folders, compare_maps};
pub use coordinator::{PairCallback, Verifier};
pub use digester::digest_side;
pub use error::VerifyError;
pub use mapping::{DirectoryComparison, PathMapping, compare_directories, map_counterpart};
pub use types::{
    BaselineMode, FolderComparison, PairOutcome, PairReport, VerificationVerdict, VerifierState,
    VerifyOptions,
};

// Re-export the lower layers so callers need a single dependency.
pub use tokio_util::sync::CancellationToken;
pub use xfercheck_digest::{DigestAlgorithm, digest_file};
pub use xfercheck_snapshot::{Snapshot, SnapshotKind};
pub use xfercheck_tree::{EnumerateOptions, TreeDigestMap};

/// Default number of files digested concurrently per side.
pub const DEFAULT_WORKERS: usize = 4;
