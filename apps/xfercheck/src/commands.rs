//! Subcommand handlers.
//!
//! Each handler returns `Ok(true)` when the check passed, `Ok(false)` when
//! it ran to completion but failed, and `Err` on setup errors.

use std::path::Path;

use tracing::{info, warn};
use xfercheck_verify::{
    BaselineMode, CancellationToken, FolderComparison, Snapshot, SnapshotKind, VerificationVerdict,
    Verifier, VerifyError, VerifyOptions, compare_folders, digest_side,
};

use crate::cli::{Command, DigestArgs};
use crate::config::Config;
use crate::oracle::PromptOracle;
use crate::transfer;

pub async fn run(command: Command, config: &Config, json: bool) -> anyhow::Result<bool> {
    match command {
        Command::Sum { path, digest } => sum(&path, &with_digest_args(&config.verify, &digest), json).await,
        Command::Compare { a, b, digest } => {
            compare(&a, &b, &with_digest_args(&config.verify, &digest), json).await
        }
        Command::Snapshot {
            server_root,
            out,
            dirs,
        } => snapshot(&server_root, &out, kind(dirs)),
        Command::Verify {
            local_root,
            server_root,
            baseline,
            two_root,
            dirs,
            rm_on_failure,
            yes,
            timeout,
            digest,
            transfer,
        } => {
            let mut options = with_digest_args(&config.verify, &digest);
            options.rm_on_failure |= rm_on_failure;
            if yes {
                options.confirm_before_rm = false;
            }
            if timeout.is_some() {
                options.timeout_secs = timeout;
            }

            let verifier = match baseline {
                Some(file) => {
                    let snapshot = Snapshot::load(&file)?;
                    if snapshot.root() != server_root.as_path() {
                        anyhow::bail!(
                            "baseline {} was captured for {}, not {}",
                            file.display(),
                            snapshot.root().display(),
                            server_root.display()
                        );
                    }
                    Verifier::from_snapshot(&local_root, snapshot)?
                }
                None => {
                    // Snapshotting and diffing back to back can never find
                    // anything new, which would pass without checking a file.
                    if !two_root && transfer.is_empty() {
                        anyhow::bail!(
                            "nothing to verify: without a transfer command the server snapshot is \
                             taken after the transfer; capture one beforehand with `xfercheck \
                             snapshot` and pass it with --baseline, use --two-root, or append \
                             `-- <TRANSFER CMD>`"
                        );
                    }
                    let mode = if two_root {
                        BaselineMode::TwoRoot
                    } else {
                        BaselineMode::ServerSnapshot(kind(dirs))
                    };
                    Verifier::new(&local_root, &server_root, mode)?
                }
            };

            verify(verifier, &transfer, &options, json).await
        }
    }
}

/// Applies the shared digest flags on top of the configured defaults.
fn with_digest_args(base: &VerifyOptions, args: &DigestArgs) -> VerifyOptions {
    let mut options = base.clone();
    if let Some(algorithm) = args.algorithm {
        options.algorithm = algorithm;
    }
    if args.no_recursive {
        options.recursive = false;
    }
    if args.include_hidden {
        options.include_hidden = true;
    }
    if let Some(workers) = args.workers {
        options.workers = workers.max(1);
    }
    options
}

fn kind(dirs: bool) -> SnapshotKind {
    if dirs {
        SnapshotKind::Directories
    } else {
        SnapshotKind::Files
    }
}

async fn sum(path: &Path, options: &VerifyOptions, json: bool) -> anyhow::Result<bool> {
    let map = digest_side(
        path,
        options.enumerate_options(),
        options.algorithm,
        options.workers,
    )
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&map)?);
    } else {
        for (key, digest) in map.iter() {
            println!("{}  {key}", digest.hex_digest);
        }
    }
    Ok(true)
}

async fn compare(a: &Path, b: &Path, options: &VerifyOptions, json: bool) -> anyhow::Result<bool> {
    match compare_folders(a, b, options).await {
        Ok(comparison) => {
            print_comparison(&comparison, json)?;
            Ok(comparison.all_match)
        }
        Err(VerifyError::StructuralMismatch {
            missing, unexpected, ..
        }) => {
            if json {
                let report = serde_json::json!({
                    "all_match": false,
                    "missing": missing,
                    "unexpected": unexpected,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for key in &missing {
                    println!("MISSING  {key}");
                }
                for key in &unexpected {
                    println!("EXTRA    {key}");
                }
                println!("folders hold different files");
            }
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_comparison(comparison: &FolderComparison, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(comparison)?);
        return Ok(());
    }
    for key in comparison.mismatched() {
        println!("FAIL     {key}");
    }
    println!(
        "{} files compared with {}: {}",
        comparison.files.len(),
        comparison.algorithm,
        if comparison.all_match { "all match" } else { "MISMATCH" }
    );
    Ok(())
}

fn snapshot(server_root: &Path, out: &Path, kind: SnapshotKind) -> anyhow::Result<bool> {
    let snapshot = Snapshot::capture(server_root, kind)?;
    snapshot.save(out)?;
    info!(
        root = %server_root.display(),
        out = %out.display(),
        entries = snapshot.entries().len(),
        "baseline saved"
    );
    Ok(true)
}

async fn verify(
    mut verifier: Verifier,
    transfer_argv: &[String],
    options: &VerifyOptions,
    json: bool,
) -> anyhow::Result<bool> {
    if !transfer_argv.is_empty() {
        transfer::run(transfer_argv).await?;
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, abandoning verification");
            on_interrupt.cancel();
        }
    });

    let oracle = PromptOracle::terminal();
    let verdict = verifier.verify(options, &oracle, cancel).await?;
    print_verdict(&verdict, json)?;
    Ok(verdict.transfer_ok)
}

fn print_verdict(verdict: &VerificationVerdict, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(verdict)?);
        return Ok(());
    }

    for (key, ok) in &verdict.files {
        println!("{}  {key}", if *ok { "OK  " } else { "FAIL" });
    }
    for path in &verdict.removed {
        println!("removed {}", path.display());
    }

    let status = if verdict.cancelled {
        "CANCELLED"
    } else if verdict.transfer_ok {
        "OK"
    } else {
        "FAILED"
    };
    println!(
        "transfer {status}: {} pairs, {} files checked with {}",
        verdict.pairs.len(),
        verdict.files.len(),
        verdict.algorithm
    );
    Ok(())
}
