//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use xfercheck_verify::DigestAlgorithm;

/// xfercheck - verify that a transfer arrived intact.
#[derive(Debug, Parser)]
#[command(name = "xfercheck", version, about = "Verify that a local → server transfer arrived intact")]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/xfercheck/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Digest selection shared by every subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct DigestArgs {
    /// Digest algorithm: md5, sha1 or sha256
    #[arg(short, long)]
    pub algorithm: Option<DigestAlgorithm>,

    /// Only digest the top level of directories
    #[arg(long)]
    pub no_recursive: bool,

    /// Include dotfiles
    #[arg(long)]
    pub include_hidden: bool,

    /// Files digested concurrently per side
    #[arg(long)]
    pub workers: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the digest of a file, or of every file in a folder
    Sum {
        path: PathBuf,
        #[command(flatten)]
        digest: DigestArgs,
    },

    /// Compare two folders that should be identical
    Compare {
        a: PathBuf,
        b: PathBuf,
        #[command(flatten)]
        digest: DigestArgs,
    },

    /// Capture a baseline snapshot of a server root
    Snapshot {
        server_root: PathBuf,
        /// Where to write the snapshot
        #[arg(short, long, value_name = "FILE")]
        out: PathBuf,
        /// Track directories instead of files
        #[arg(long)]
        dirs: bool,
    },

    /// Verify a transfer from LOCAL_ROOT to SERVER_ROOT
    Verify {
        local_root: PathBuf,
        server_root: PathBuf,

        /// Baseline captured earlier with `xfercheck snapshot`
        #[arg(long, value_name = "FILE", conflicts_with = "two_root")]
        baseline: Option<PathBuf>,

        /// Compare the child directories of both roots instead of snapshotting
        #[arg(long)]
        two_root: bool,

        /// Track directories instead of files
        #[arg(long)]
        dirs: bool,

        /// Delete server paths that fail verification
        #[arg(long)]
        rm_on_failure: bool,

        /// Delete without asking
        #[arg(short, long)]
        yes: bool,

        /// Abandon verification after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        #[command(flatten)]
        digest: DigestArgs,

        /// Transfer command to run between baseline and verification
        #[arg(last = true, value_name = "TRANSFER")]
        transfer: Vec<String>,
    },
}
