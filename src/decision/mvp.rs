use serde_json::json;

use super::types::ReasoningEntry;
use crate::project::Task;

/// Keywords marking a task as MVP-core work.
const MVP_PATTERNS: &[&str] = &[
    "setup",
    "scaffold",
    "navigation",
    "home",
    "list",
    "detail",
    "basic",
    "initial",
    "core",
    "main screen",
];

/// Keywords marking work that can wait until after the MVP ships.
const DEFER_PATTERNS: &[&str] = &[
    "analytics",
    "settings",
    "profile",
    "onboarding",
    "tutorial",
    "advanced",
    "optimization",
    "polish",
];

pub(super) struct MvpResult {
    pub approved: Vec<Task>,
    pub deferred: Vec<Task>,
}

/// Classify each task by its title + description. A defer keyword wins over
/// a core keyword; tasks matching neither set stay approved.
pub(super) fn evaluate_mvp_first(tasks: Vec<Task>, log: &mut Vec<ReasoningEntry>) -> MvpResult {
    let total = tasks.len();
    let mut approved = Vec::new();
    let mut deferred = Vec::new();

    for task in tasks {
        let text = format!("{} {}", task.title, task.description).to_lowercase();
        let is_defer = DEFER_PATTERNS.iter().any(|p| text.contains(p));

        if is_defer {
            deferred.push(task);
        } else {
            approved.push(task);
        }
    }

    let core = approved.iter().filter(|t| is_mvp_core(t)).count();
    log.push(ReasoningEntry::new(
        "mvp_evaluator",
        json!({ "total": total, "mvp": approved.len(), "core": core, "deferred": deferred.len() }),
        format!(
            "MVP-first: {} approved ({} core), {} deferred",
            approved.len(),
            core,
            deferred.len()
        ),
        0.8,
    ));

    MvpResult { approved, deferred }
}

/// True when the task text carries an MVP-core keyword; decorates the
/// reasoning entry, the gate itself only defers.
fn is_mvp_core(task: &Task) -> bool {
    let text = format!("{} {}", task.title, task.description).to_lowercase();
    MVP_PATTERNS.iter().any(|p| text.contains(p))
}
