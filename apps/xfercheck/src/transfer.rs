//! Runs the user's transfer command between baseline and verification.

use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{info, warn};

/// Spawns `argv` with inherited stdio and waits for it.
///
/// A non-zero exit is only logged: whatever the command managed to copy is
/// still verified. Failing to spawn at all is an error.
pub async fn run(argv: &[String]) -> anyhow::Result<ExitStatus> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("empty transfer command"))?;

    info!(%program, args = args.len(), "running transfer command");
    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|e| anyhow::anyhow!("failed to run transfer command {program}: {e}"))?;

    if status.success() {
        info!(%program, "transfer command finished");
    } else {
        warn!(%program, %status, "transfer command failed, verifying anyway");
    }
    Ok(status)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn runs_command_and_returns_status() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("copied");

        let status = run(&argv(&["touch", target.to_str().unwrap()])).await.unwrap();
        assert!(status.success());
        assert!(target.exists());
    }

    #[tokio::test]
    async fn non_zero_exit_is_not_an_error() {
        let status = run(&argv(&["false"])).await.unwrap();
        assert!(!status.success());
    }

    #[tokio::test]
    async fn empty_command_is_an_error() {
        assert!(run(&[]).await.is_err());
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let result = run(&argv(&["/nonexistent/xfercheck-transfer"])).await;
        assert!(result.is_err());
    }
}
