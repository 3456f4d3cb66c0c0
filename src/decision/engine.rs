use serde_json::json;
use tracing::debug;

use super::complexity::score_complexity;
use super::modes::AutonomyMode;
use super::mvp::evaluate_mvp_first;
use super::scope::evaluate_scope;
use super::types::{DecisionOutcome, DecisionResult, ReasoningEntry};
use crate::project::{ProjectMemorySummary, Task};

/// Average complexity above `COMPLEXITY_THRESHOLD * mode strictness` defers
/// the last approved task.
pub const COMPLEXITY_THRESHOLD: f64 = 0.75;

/// Heuristic triage of a proposed task list before anything is dispatched.
///
/// Three gates run in order: scope, MVP-first, complexity. Each appends to
/// the reasoning log so a decision can be audited later. This bounds the
/// blast radius of autonomous execution; it does not judge task quality.
/// Pure: no I/O, fully deterministic for a given input.
pub struct DecisionEngine;

impl DecisionEngine {
    pub fn evaluate(
        idea: &str,
        proposed_tasks: Vec<Task>,
        memory: Option<&ProjectMemorySummary>,
        mode: AutonomyMode,
    ) -> DecisionResult {
        let mut reasoning_log = Vec::new();
        let mut rejected_reasons = Vec::new();
        let proposed_count = proposed_tasks.len();

        if let Some(memory) = memory.filter(|m| !m.is_empty()) {
            debug!(
                project_id = %memory.project_id,
                failed_fix_patterns = memory.failed_fix_patterns.len(),
                architecture_decisions = memory.architecture_decisions.len(),
                "Evaluating with prior project memory"
            );
        }

        if idea.trim().is_empty() {
            reasoning_log.push(ReasoningEntry::new(
                "scope_gate_idea",
                json!({ "idea_length": idea.len() }),
                "Rejected: idea must not be empty",
                1.0,
            ));
            rejected_reasons.push(String::from("Idea must not be empty"));
            return DecisionResult {
                outcome: DecisionOutcome::Reject,
                approved_tasks: Vec::new(),
                postponed_tasks: proposed_tasks,
                rejected_reasons,
                reasoning_log,
                scope_score: 1.0,
                complexity_score: 0.0,
            };
        }

        let scope = evaluate_scope(proposed_tasks, &mut reasoning_log);
        let mut postponed_tasks = scope.postponed;
        rejected_reasons.extend(scope.reasons);

        let mvp = evaluate_mvp_first(scope.approved, &mut reasoning_log);
        let mut approved_tasks = mvp.approved;
        postponed_tasks.extend(mvp.deferred);

        let complexity = score_complexity(&approved_tasks, &mut reasoning_log);
        let strictness = mode.strictness();
        if complexity.average > COMPLEXITY_THRESHOLD * strictness {
            if let Some(last) = approved_tasks.pop() {
                postponed_tasks.push(last);
            }
            rejected_reasons.push(format!(
                "Complexity too high ({:.2}), deferred last task",
                complexity.average
            ));
        }

        let outcome = if approved_tasks.is_empty() {
            DecisionOutcome::Reject
        } else {
            DecisionOutcome::Approve
        };
        let scope_score = 1.0 - approved_tasks.len() as f64 / proposed_count.max(1) as f64;

        DecisionResult {
            outcome,
            approved_tasks,
            postponed_tasks,
            rejected_reasons,
            reasoning_log,
            scope_score,
            complexity_score: complexity.average,
        }
    }
}
