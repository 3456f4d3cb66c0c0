//! Task-approval triage: three sequential gates bounding what the coding
//! agent may be asked to do in one round.
//!
//! - scope gate: task-count ceiling and per-prompt length ceiling
//! - MVP evaluator: keyword classification into core vs. deferrable work
//! - complexity gate: keyword risk scoring against the mode's strictness

mod complexity;
mod engine;
mod modes;
mod mvp;
mod scope;
mod types;

pub use engine::{DecisionEngine, COMPLEXITY_THRESHOLD};
pub use modes::{AutonomyMode, CodingBehavior, DeploymentBehavior, ModeBehavior, Phase, PlanningBehavior};
pub use scope::{MAX_MVP_TASKS, MAX_TASK_PROMPT_LENGTH};
pub use types::{DecisionOutcome, DecisionResult, ReasoningEntry};
