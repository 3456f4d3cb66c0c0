use serde_json::json;

use super::types::ReasoningEntry;
use crate::project::Task;

/// Hard ceiling on tasks approved for one MVP round.
pub const MAX_MVP_TASKS: usize = 8;
/// Hard ceiling on a single task prompt, in characters.
pub const MAX_TASK_PROMPT_LENGTH: usize = 1500;

pub(super) struct ScopeGateResult {
    pub approved: Vec<Task>,
    pub postponed: Vec<Task>,
    pub reasons: Vec<String>,
}

/// Bound what one round may attempt: truncate oversized task lists, then
/// push out any task whose prompt alone is too big a unit of work.
pub(super) fn evaluate_scope(tasks: Vec<Task>, log: &mut Vec<ReasoningEntry>) -> ScopeGateResult {
    let mut reasons = Vec::new();
    let mut postponed = Vec::new();
    let mut candidates = tasks;

    if candidates.len() > MAX_MVP_TASKS {
        log.push(ReasoningEntry::new(
            "scope_gate_max_tasks",
            json!({ "count": candidates.len(), "max": MAX_MVP_TASKS }),
            format!(
                "Rejected: {} tasks exceeds MVP limit of {}",
                candidates.len(),
                MAX_MVP_TASKS
            ),
            1.0,
        ));
        reasons.push(format!(
            "Scope explosion: {} tasks exceeds MVP limit ({})",
            candidates.len(),
            MAX_MVP_TASKS
        ));
        postponed = candidates.split_off(MAX_MVP_TASKS);
    }

    let mut approved = Vec::with_capacity(candidates.len());
    for task in candidates {
        let prompt_len = task.prompt.chars().count();
        if prompt_len > MAX_TASK_PROMPT_LENGTH {
            log.push(ReasoningEntry::new(
                "scope_gate_prompt_length",
                json!({ "taskId": task.id, "length": prompt_len }),
                format!("Task {} prompt too long ({} chars)", task.id, prompt_len),
                0.9,
            ));
            reasons.push(format!("Task \"{}\" has oversized prompt", task.title));
            postponed.push(task);
        } else {
            approved.push(task);
        }
    }

    ScopeGateResult {
        approved,
        postponed,
        reasons,
    }
}
