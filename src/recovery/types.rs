use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse triage bucket for a verification failure. Drives the retry budget
/// and the choice between retrying the coder and escalating to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Dependency,
    Syntax,
    Architecture,
    Environment,
    Unknown,
}

impl FailureCategory {
    /// Retries granted before the failure escalates past the coding agent.
    pub fn max_attempts(self) -> u32 {
        match self {
            Self::Dependency => 2,
            Self::Syntax => 3,
            Self::Architecture => 2,
            // Environment problems are not fixable by agent retry at all.
            Self::Environment => 1,
            Self::Unknown => 2,
        }
    }

    pub fn root_cause_hint(self) -> &'static str {
        match self {
            Self::Dependency => {
                "Missing or incompatible package. Try: bun install or npm install, check package.json."
            }
            Self::Syntax => "Code syntax or type error. Check file and line number in error.",
            Self::Architecture => {
                "Structural issue: circular import, wrong export, or hook usage."
            }
            Self::Environment => {
                "Environment or config issue: paths, permissions, or Expo config."
            }
            Self::Unknown => "Unclassified error. Manual review recommended.",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dependency => "dependency",
            Self::Syntax => "syntax",
            Self::Architecture => "architecture",
            Self::Environment => "environment",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// What the completion handler should do with a failed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryAction {
    Retry,
    Escalate,
    Abort,
}

impl fmt::Display for RetryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Retry => "retry",
            Self::Escalate => "escalate",
            Self::Abort => "abort",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryDecision {
    pub action: RetryAction,
    pub max_attempts: u32,
    pub attempt_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_prompt: Option<String>,
}

/// Full verdict over one failed verification round. Derived on demand from
/// the error output; never stored on the project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub category: FailureCategory,
    pub root_cause_hint: String,
    pub retry: RetryDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_prompt: Option<String>,
    pub should_escalate: bool,
}

impl FailureAnalysis {
    pub fn action(&self) -> RetryAction {
        self.retry.action
    }
}
