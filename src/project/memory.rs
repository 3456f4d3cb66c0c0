use serde::{Deserialize, Serialize};

/// Condensed history of a project's earlier runs, fed into the decision
/// engine as context. Built by an external memory service; the engine only
/// reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectMemorySummary {
    pub project_id: String,
    pub architecture_decisions: Vec<String>,
    pub failed_fix_patterns: Vec<String>,
    pub last_prompts: Vec<String>,
    pub tradeoffs: Vec<String>,
}

impl ProjectMemorySummary {
    pub fn is_empty(&self) -> bool {
        self.architecture_decisions.is_empty()
            && self.failed_fix_patterns.is_empty()
            && self.last_prompts.is_empty()
            && self.tradeoffs.is_empty()
    }
}
