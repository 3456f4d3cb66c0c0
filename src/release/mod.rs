//! Final release step, gated on human approval.
//!
//! Invoked exactly once per project, on the `awaiting_approval ->
//! completed` transition. A failed release leaves the project awaiting
//! approval so the step can be retried.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ReleaseConfig;
use crate::error::{ForemanError, Result};
use crate::verification::run_command;

#[async_trait]
pub trait ReleaseRunner: Send + Sync {
    async fn execute(&self, project_id: &str, checkout: &Path) -> Result<()>;
}

/// Runs the configured app-store build-and-submit command in the project
/// checkout. Success is exit 0 within the timeout, nothing more.
pub struct EasReleaseRunner {
    config: ReleaseConfig,
}

impl EasReleaseRunner {
    pub fn new(config: ReleaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ReleaseRunner for EasReleaseRunner {
    async fn execute(&self, project_id: &str, checkout: &Path) -> Result<()> {
        info!(project_id, dir = %checkout.display(), "Starting release build");
        let output = run_command(
            "release",
            &self.config.command,
            checkout,
            Duration::from_secs(self.config.timeout_secs),
        )
        .await;

        if output.success() {
            info!(project_id, duration_ms = output.duration_ms, "Release completed");
            Ok(())
        } else {
            let tail: String = output
                .stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            warn!(project_id, timed_out = output.timed_out, "Release failed");
            Err(ForemanError::Release(format!(
                "{}: {}",
                project_id,
                if output.timed_out { "timed out" } else { tail.trim() }
            )))
        }
    }
}

/// Used when releases are disabled: approval completes the project without
/// touching any store.
pub struct NoopReleaseRunner;

#[async_trait]
impl ReleaseRunner for NoopReleaseRunner {
    async fn execute(&self, project_id: &str, _checkout: &Path) -> Result<()> {
        info!(project_id, "Release step disabled, skipping");
        Ok(())
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn runner_with_command(command: &str) -> EasReleaseRunner {
        EasReleaseRunner::new(ReleaseConfig {
            enabled: true,
            command: command.to_string(),
            timeout_secs: 10,
        })
    }

    #[tokio::test]
    async fn test_successful_command_releases() {
        let dir = TempDir::new().unwrap();
        let runner = runner_with_command("true");
        assert!(runner.execute("proj_1", dir.path()).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_command_is_release_error() {
        let dir = TempDir::new().unwrap();
        let runner = runner_with_command("echo 'submit rejected' 1>&2; exit 1");
        let err = runner.execute("proj_1", dir.path()).await.unwrap_err();

        assert!(matches!(err, ForemanError::Release(_)));
        assert!(err.to_string().contains("submit rejected"));
    }

    #[tokio::test]
    async fn test_noop_runner_always_succeeds() {
        let dir = TempDir::new().unwrap();
        assert!(NoopReleaseRunner.execute("proj_1", dir.path()).await.is_ok());
    }
}
