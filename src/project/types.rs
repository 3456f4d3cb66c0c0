use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single unit of work handed to the coding agent.
/// Immutable once dispatched; `prompt` is the exact instruction sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prompt: String,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            prompt: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

/// Location of the target repository plus the working branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRef {
    pub repository: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

fn default_branch() -> String {
    String::from("main")
}

impl RepoRef {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            branch: default_branch(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repository, self.branch)
    }
}

/// Outcome of one verification round. Produced fresh each round, never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
}

impl VerificationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            stdout: None,
            stderr: None,
        }
    }

    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            success: false,
            errors,
            stdout: None,
            stderr: None,
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = Some(stdout.into());
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = Some(stderr.into());
        self
    }
}

/// Per-project override of the agent credentials.
///
/// Never logged and never serialized: `Debug` redacts every field and the
/// aggregate skips it entirely when persisting state.
#[derive(Clone, Default)]
pub struct AgentCredentials {
    pub coder_api_key: Option<String>,
    pub planner_token: Option<String>,
    pub github_token: Option<String>,
}

impl AgentCredentials {
    pub fn has_coder_key(&self) -> bool {
        self.coder_api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// A planner channel counts as configured only with a real token.
    pub fn has_planner_channel(&self) -> bool {
        self.planner_token.as_deref().is_some_and(|t| t.len() >= 16)
    }
}

impl fmt::Debug for AgentCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentCredentials")
            .field("coder_api_key", &self.coder_api_key.as_ref().map(|_| "<redacted>"))
            .field("planner_token", &self.planner_token.as_ref().map(|_| "<redacted>"))
            .field("github_token", &self.github_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Owner attribution used to filter multi-tenant project listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_id: Option<String>,
}

impl TenantRef {
    pub fn matches(&self, filter: &TenantFilter) -> bool {
        if let Some(user_id) = &filter.user_id {
            if self.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        if let Some(api_key_id) = &filter.api_key_id {
            if self.api_key_id.as_deref() != Some(api_key_id.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Listing filter; empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct TenantFilter {
    pub user_id: Option<String>,
    pub api_key_id: Option<String>,
}

/// Caller-facing view of a project. Carries no prompts and no credentials.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub idea: String,
    pub status: String,
    pub repository: RepoRef,
    pub task_count: usize,
    pub current_index: usize,
    pub iteration: u32,
    pub max_iterations: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
