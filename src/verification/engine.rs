//! Verification pipeline: install, lint, test, and an optional doctor pass.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::VerificationConfig;
use crate::project::VerificationResult;

use super::errors::extract_errors;
use super::runner::run_command;

const LINT_TIMEOUT_CAP: Duration = Duration::from_secs(60);
const DOCTOR_TIMEOUT_CAP: Duration = Duration::from_secs(30);
const DOCTOR_ERROR_CAP: usize = 5;
const LOGGED_ERROR_SAMPLE: usize = 5;

/// Runs the configured command pipeline against a checked-out repository.
///
/// Every step contributes its output to the result; a step failing does not
/// abort the pipeline, so one verification pass reports everything it found.
#[derive(Clone)]
pub struct VerificationEngine {
    config: VerificationConfig,
}

impl VerificationEngine {
    pub fn new(config: VerificationConfig) -> Self {
        Self { config }
    }

    pub async fn verify(&self, repo_path: &Path) -> VerificationResult {
        if !repo_path.join(&self.config.manifest).exists() {
            warn!(
                manifest = %self.config.manifest,
                dir = %repo_path.display(),
                "Manifest missing, skipping command pipeline"
            );
            return VerificationResult::failed(vec![format!(
                "{} not found or not accessible",
                self.config.manifest
            )]);
        }

        let timeout = Duration::from_millis(self.config.timeout_ms);
        let mut errors: Vec<String> = Vec::new();
        let mut stdout_parts: Vec<String> = Vec::new();
        let mut stderr_parts: Vec<String> = Vec::new();

        let install =
            run_command("install", &self.config.install_cmd, repo_path, timeout).await;
        if !install.success() {
            errors.extend(extract_errors(&install.stdout, &install.stderr));
        }
        stdout_parts.push(install.stdout);
        stderr_parts.push(install.stderr);

        let lint = run_command(
            "lint",
            &self.config.lint_cmd,
            repo_path,
            timeout.min(LINT_TIMEOUT_CAP),
        )
        .await;
        if !lint.success() {
            errors.extend(extract_errors(&lint.stdout, &lint.stderr));
        }
        stdout_parts.push(lint.stdout);
        stderr_parts.push(lint.stderr);

        let tests = run_command("test", &self.config.test_cmd, repo_path, timeout).await;
        if !tests.success() {
            errors.extend(extract_errors(&tests.stdout, &tests.stderr));
        }
        stdout_parts.push(tests.stdout);
        stderr_parts.push(tests.stderr);

        if repo_path.join(&self.config.app_manifest).exists() {
            let doctor = run_command(
                "doctor",
                &self.config.doctor_cmd,
                repo_path,
                timeout.min(DOCTOR_TIMEOUT_CAP),
            )
            .await;
            if !doctor.success() {
                let mut doctor_errors = extract_errors(&doctor.stdout, &doctor.stderr);
                doctor_errors.truncate(DOCTOR_ERROR_CAP);
                errors.extend(doctor_errors);
            }
            stdout_parts.push(doctor.stdout);
            stderr_parts.push(doctor.stderr);
        }

        if errors.is_empty() {
            info!(dir = %repo_path.display(), "Verification passed");
        } else {
            warn!(
                dir = %repo_path.display(),
                error_count = errors.len(),
                sample = ?&errors[..errors.len().min(LOGGED_ERROR_SAMPLE)],
                "Verification failed"
            );
        }

        let mut result = if errors.is_empty() {
            VerificationResult::ok()
        } else {
            VerificationResult::failed(errors)
        };

        let all_stdout = join_parts(stdout_parts);
        if !all_stdout.is_empty() {
            result = result.with_stdout(all_stdout);
        }
        let all_stderr = join_parts(stderr_parts);
        if !all_stderr.is_empty() {
            result = result.with_stderr(all_stderr);
        }
        result
    }
}

fn join_parts(parts: Vec<String>) -> String {
    let joined: Vec<String> = parts.into_iter().filter(|p| !p.trim().is_empty()).collect();
    joined.join("\n")
}
