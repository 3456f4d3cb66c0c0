use async_trait::async_trait;

use crate::error::Result;
use crate::project::{AgentCredentials, RepoRef};

/// Lifecycle status reported by the coding-agent service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoderRunStatus {
    Pending,
    Running,
    Finished,
    Error,
    Other(String),
}

impl CoderRunStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "PENDING" | "CREATING" => Self::Pending,
            "RUNNING" => Self::Running,
            "FINISHED" => Self::Finished,
            "ERROR" => Self::Error,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

/// External service that implements one task against a repository.
/// Completion arrives later as an inbound signal, not as a return value.
#[async_trait]
pub trait CoderClient: Send + Sync {
    /// Starts a run and returns its agent id. The id supersedes any earlier
    /// run on the same project.
    async fn launch(
        &self,
        prompt: &str,
        repo: &RepoRef,
        credentials: &AgentCredentials,
    ) -> Result<String>;

    async fn status(
        &self,
        agent_id: &str,
        credentials: &AgentCredentials,
    ) -> Result<CoderRunStatus>;

    /// Appends an instruction to an existing run's conversation.
    async fn followup(
        &self,
        agent_id: &str,
        prompt: &str,
        credentials: &AgentCredentials,
    ) -> Result<()>;
}

/// External service that researches ideas and proposes plans or fixes.
/// Fire-and-forget: replies arrive via a separate inbound signal correlated
/// only by project id.
#[async_trait]
pub trait PlannerClient: Send + Sync {
    async fn send(&self, message: &str, credentials: &AgentCredentials) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(CoderRunStatus::parse("FINISHED"), CoderRunStatus::Finished);
        assert_eq!(CoderRunStatus::parse("ERROR"), CoderRunStatus::Error);
        assert_eq!(CoderRunStatus::parse("RUNNING"), CoderRunStatus::Running);
        assert_eq!(
            CoderRunStatus::parse("EXPIRED"),
            CoderRunStatus::Other("EXPIRED".into())
        );
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(CoderRunStatus::Finished.is_terminal());
        assert!(CoderRunStatus::Error.is_terminal());
        assert!(!CoderRunStatus::Running.is_terminal());
    }
}
