//! Shell command execution with hard wall-clock timeouts.

use std::path::Path;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::{debug, warn};

/// Captured outcome of a single verification command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs `cmd` through the platform shell and waits at most `timeout`.
///
/// Expiry kills the child and is reported as a failure; it never
/// propagates as an error, so callers can treat every outcome uniformly.
pub async fn run_command(
    name: &str,
    cmd: &str,
    working_dir: &Path,
    timeout: Duration,
) -> CommandOutput {
    let mut command = build_shell_command(cmd, working_dir);
    execute(name, Some(cmd), &mut command, timeout).await
}

/// Runs `program` directly with `args`, bypassing the shell.
pub async fn run_program(
    name: &str,
    program: &str,
    args: &[&str],
    working_dir: &Path,
    timeout: Duration,
) -> CommandOutput {
    let mut command = Command::new(program);
    command.args(args).current_dir(working_dir).kill_on_drop(true);
    execute(name, None, &mut command, timeout).await
}

async fn execute(
    name: &str,
    cmd: Option<&str>,
    command: &mut Command,
    timeout: Duration,
) -> CommandOutput {
    let start = Instant::now();
    debug!(step = %name, cmd = cmd.unwrap_or_default(), "Running verification command");

    let result = tokio::time::timeout(timeout, command.output()).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            if output.status.success() {
                debug!(step = %name, duration_ms, "Command passed");
            } else {
                warn!(step = %name, code = ?output.status.code(), duration_ms, "Command failed");
            }
            CommandOutput {
                stdout,
                stderr,
                exit_code: output.status.code(),
                timed_out: false,
                duration_ms,
            }
        }
        Ok(Err(e)) => {
            warn!(step = %name, error = %e, "Execution error");
            CommandOutput {
                stdout: String::new(),
                stderr: e.to_string(),
                exit_code: None,
                timed_out: false,
                duration_ms,
            }
        }
        Err(_) => {
            warn!(step = %name, timeout_secs = timeout.as_secs(), "Command timed out");
            CommandOutput {
                stdout: String::new(),
                stderr: format!("{} timed out after {}s", name, timeout.as_secs()),
                exit_code: None,
                timed_out: true,
                duration_ms,
            }
        }
    }
}

#[cfg(windows)]
fn build_shell_command(cmd: &str, working_dir: &Path) -> Command {
    let mut command = Command::new("cmd");
    command
        .args(["/C", cmd])
        .current_dir(working_dir)
        .kill_on_drop(true);
    command
}

#[cfg(not(windows))]
fn build_shell_command(cmd: &str, working_dir: &Path) -> Command {
    let mut command = Command::new("sh");
    command
        .args(["-c", cmd])
        .current_dir(working_dir)
        .kill_on_drop(true);
    command
}
