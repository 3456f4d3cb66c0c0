use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForemanError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Invalid project status: expected {expected}, got {actual}")]
    InvalidProjectStatus { expected: String, actual: String },

    #[error("Invalid status transition: {from} -> {to} (allowed: {allowed})")]
    InvalidStatusTransition {
        from: String,
        to: String,
        allowed: String,
    },

    #[error("Task not found: {project_id}/{task_id}")]
    TaskNotFound {
        project_id: String,
        task_id: String,
    },

    #[error("Coding agent error: {0}")]
    Coder(String),

    #[error("Planning agent error: {0}")]
    Planner(String),

    #[error("Planning channel not configured")]
    PlannerUnconfigured,

    #[error("Repository error: {0}")]
    Repo(String),

    #[error("Release failed: {0}")]
    Release(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("State persistence failed: {0}")]
    StatePersistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

impl ForemanError {
    /// Transient errors are worth retrying at the client boundary;
    /// everything else surfaces immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ForemanError>;
