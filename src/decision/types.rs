use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::project::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approve,
    Reject,
}

/// One audit-log line from a decision rule: which rule fired, what it saw,
/// what it concluded, and how confident the heuristic is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningEntry {
    pub timestamp: DateTime<Utc>,
    pub rule: String,
    pub input: Value,
    pub output: String,
    pub confidence: f64,
}

impl ReasoningEntry {
    pub fn new(rule: impl Into<String>, input: Value, output: impl Into<String>, confidence: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            rule: rule.into(),
            input,
            output: output.into(),
            confidence,
        }
    }
}

/// Verdict of the decision engine over one proposed task list.
/// Recorded as provenance at project creation; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionResult {
    pub outcome: DecisionOutcome,
    pub approved_tasks: Vec<Task>,
    pub postponed_tasks: Vec<Task>,
    pub rejected_reasons: Vec<String>,
    pub reasoning_log: Vec<ReasoningEntry>,
    pub scope_score: f64,
    pub complexity_score: f64,
}

impl DecisionResult {
    pub fn approved(&self) -> bool {
        self.outcome == DecisionOutcome::Approve
    }
}
