use tracing::debug;

use super::classifier::classify_failure;
use super::types::{FailureAnalysis, FailureCategory, RetryAction, RetryDecision};
use crate::project::Task;

/// Decide what to do with a failed verification round.
///
/// `attempt_number` counts failures already recorded against the current
/// task; once it reaches the category's budget the failure escalates — to
/// the planner for most categories, or to an abort for environment failures,
/// which no amount of agent retry can repair.
pub fn analyze_failure(
    errors: &[String],
    stderr: Option<&str>,
    task_prompt: &str,
    attempt_number: u32,
) -> FailureAnalysis {
    let category = classify_failure(errors, stderr);
    let max_attempts = category.max_attempts();
    let should_escalate = attempt_number >= max_attempts;

    debug!(
        category = %category,
        attempt_number,
        max_attempts,
        prompt_len = task_prompt.len(),
        "Analyzed verification failure"
    );

    let action = if should_escalate {
        if category == FailureCategory::Environment {
            RetryAction::Abort
        } else {
            RetryAction::Escalate
        }
    } else {
        RetryAction::Retry
    };

    let suggested_prompt = match category {
        FailureCategory::Dependency if !should_escalate => Some(format!(
            "Fix dependency error. Run: bun install (or npm install). Then fix any import errors. Error: {}",
            first_lines(errors, 2)
        )),
        FailureCategory::Syntax if !should_escalate => Some(format!(
            "Fix the TypeScript/syntax error. Check the exact file and line. Error: {}",
            first_lines(errors, 2)
        )),
        _ => None,
    };

    FailureAnalysis {
        category,
        root_cause_hint: category.root_cause_hint().to_string(),
        retry: RetryDecision {
            action,
            max_attempts,
            attempt_number,
            modified_prompt: suggested_prompt.clone(),
        },
        suggested_prompt,
        should_escalate,
    }
}

/// Deterministic fix instruction for categories without a templated prompt.
/// Quotes the task context and up to five error lines.
pub fn fallback_fix_prompt(task: &Task, errors: &[String]) -> String {
    let quoted: Vec<&str> = errors.iter().map(|e| e.as_str()).take(5).collect();
    format!(
        "The previous change for task \"{}\" failed verification. Fix only the errors below, without unrelated changes.\n\nTask context: {}\n\nErrors:\n{}",
        task.title,
        task.prompt,
        quoted.join("\n")
    )
}

fn first_lines(errors: &[String], n: usize) -> String {
    errors
        .iter()
        .take(n)
        .map(|e| e.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
