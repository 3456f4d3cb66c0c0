//! Repository acquisition: shallow clone with a pull-based fast path.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{ForemanError, Result};

use super::runner::run_program;

const PULL_TIMEOUT: Duration = Duration::from_secs(30);
const CLONE_TIMEOUT: Duration = Duration::from_secs(60);

/// Materializes `repository` at `branch` into `target`.
///
/// An existing checkout is refreshed with a pull; when the pull fails the
/// directory is discarded and recloned from scratch. The access token only
/// ever appears inside the clone URL handed to git, never in logs or errors.
pub async fn clone_or_update(
    repository: &str,
    branch: &str,
    target: &Path,
    token: Option<&str>,
) -> Result<()> {
    let url = clone_url(repository, token);
    let display_url = clone_url(repository, None);

    if target.exists() {
        debug!(dir = %target.display(), branch, "Checkout present, pulling");
        let pull = run_program(
            "pull",
            "git",
            &["pull", "origin", branch],
            target,
            PULL_TIMEOUT,
        )
        .await;
        if pull.success() {
            return Ok(());
        }
        warn!(dir = %target.display(), "Pull failed, discarding checkout");
        tokio::fs::remove_dir_all(target).await?;
    }

    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    info!(url = %display_url, branch, dir = %target.display(), "Cloning repository");
    let target_str = target.to_string_lossy();
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let clone = run_program(
        "clone",
        "git",
        &["clone", "--depth", "1", "--branch", branch, &url, &target_str],
        parent,
        CLONE_TIMEOUT,
    )
    .await;

    if !clone.success() {
        return Err(ForemanError::Repo(format!(
            "clone of {} ({}) failed: {}",
            display_url,
            branch,
            redact(&clone.stderr, token)
        )));
    }
    Ok(())
}

/// Resolves a repository reference to a clonable HTTPS URL. Short
/// `owner/name` references are expanded against github.com.
fn clone_url(repository: &str, token: Option<&str>) -> String {
    let base = if repository.starts_with("http") {
        repository.to_string()
    } else {
        format!("https://github.com/{}.git", repository)
    };
    match token {
        Some(token) if !token.is_empty() && base.starts_with("https://") => {
            base.replacen("https://", &format!("https://{}@", token), 1)
        }
        _ => base,
    }
}

fn redact(output: &str, token: Option<&str>) -> String {
    let trimmed = output.trim();
    match token {
        Some(token) if !token.is_empty() => trimmed.replace(token, "<redacted>"),
        _ => trimmed.to_string(),
    }
}
