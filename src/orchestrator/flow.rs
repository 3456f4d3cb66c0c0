//! Initial orchestration: blueprint, decision triage, and the first
//! project state. Pure, no I/O; the bridge performs the actual dispatch.

use tracing::info;

use crate::decision::{AutonomyMode, DecisionEngine, DecisionOutcome, DecisionResult};
use crate::outcome::{generate_blueprint, OutcomeBlueprint};
use crate::project::{ProjectMemorySummary, Task};

pub struct FlowInput {
    pub idea: String,
    pub proposed_tasks: Vec<Task>,
    pub mode: AutonomyMode,
}

pub struct FlowOutcome {
    pub blueprint: OutcomeBlueprint,
    pub decision: DecisionResult,
    pub should_proceed: bool,
}

/// Frames an idea and triages its task list.
///
/// When the caller proposes no tasks (the planner has not spoken yet, or
/// never will), a single bootstrap task is synthesized from the blueprint so
/// the decision engine always judges something concrete.
pub fn run_flow(input: FlowInput, memory: Option<&ProjectMemorySummary>) -> FlowOutcome {
    let blueprint = generate_blueprint(&input.idea);

    let proposed_tasks = if input.proposed_tasks.is_empty() {
        vec![bootstrap_task(&input.idea, &blueprint)]
    } else {
        input.proposed_tasks
    };

    let decision = DecisionEngine::evaluate(&input.idea, proposed_tasks, memory, input.mode);
    let should_proceed =
        decision.outcome != DecisionOutcome::Reject && !decision.approved_tasks.is_empty();

    info!(
        outcome = ?decision.outcome,
        approved = decision.approved_tasks.len(),
        postponed = decision.postponed_tasks.len(),
        reasoning_entries = decision.reasoning_log.len(),
        "Orchestration decision"
    );

    FlowOutcome {
        blueprint,
        decision,
        should_proceed,
    }
}

fn bootstrap_task(idea: &str, blueprint: &OutcomeBlueprint) -> Task {
    let features: Vec<&str> = blueprint
        .mvp_features
        .iter()
        .take(3)
        .map(String::as_str)
        .collect();
    Task::new("task_1", "Initial implementation")
        .with_description(format!("Implement app based on: {}", idea))
        .with_prompt(format!(
            "Create a complete Expo/React Native app for: {}. MVP features: {}.",
            idea,
            features.join(", ")
        ))
}
