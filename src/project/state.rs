use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::ProjectStatus;
use super::types::{AgentCredentials, RepoRef, Task, TenantRef, VerificationResult};
use crate::decision::AutonomyMode;

pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Aggregate root of the engine: one idea-to-release run.
///
/// Invariants held after every operation:
/// - `0 <= current_index <= tasks.len()`
/// - `iteration <= max_iterations`
///
/// All mutation goes through the methods below; callers persist the updated
/// aggregate through the store collaborator afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectState {
    pub id: String,
    pub idea: String,
    pub repository: RepoRef,

    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub iteration: u32,
    pub max_iterations: u32,
    pub status: ProjectStatus,

    /// Autonomy granted when the project was started; decides approval gates
    /// and the unattended fix budget for the whole run.
    #[serde(default)]
    pub mode: AutonomyMode,

    /// Identifier of the in-flight coding-agent run, if any. A completion
    /// signal whose id does not match is stale and must be dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_agent_id: Option<String>,

    /// Verification failures recorded against the current task. Reset when
    /// the cursor advances; feeds the retry strategy's attempt number.
    #[serde(default)]
    pub task_attempts: u32,

    /// Never serialized; the persisted shadow copy carries no credentials.
    #[serde(skip)]
    pub credentials_override: Option<AgentCredentials>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantRef>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of `record_completion`: what to do next.
#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub next_task: Option<Task>,
    pub status: ProjectStatus,
    pub should_continue: bool,
}

impl ProjectState {
    pub fn new(idea: impl Into<String>, repository: RepoRef) -> Self {
        let now = Utc::now();
        Self {
            id: generate_project_id(),
            idea: idea.into(),
            repository,
            tasks: Vec::new(),
            current_index: 0,
            iteration: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            status: ProjectStatus::Running,
            mode: AutonomyMode::default(),
            current_agent_id: None,
            task_attempts: 0,
            credentials_override: None,
            tenant: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_mode(mut self, mode: AutonomyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_credentials(mut self, credentials: AgentCredentials) -> Self {
        self.credentials_override = Some(credentials);
        self
    }

    pub fn with_tenant(mut self, tenant: TenantRef) -> Self {
        self.tenant = Some(tenant);
        self
    }

    /// The task the cursor points at, or `None` once past the end.
    pub fn next_task(&self) -> Option<&Task> {
        self.tasks.get(self.current_index)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Core transition after one verification round.
    ///
    /// The iteration budget is checked first and unconditionally: once the
    /// budget is spent the project fails even if this round succeeded. On
    /// success the cursor advances (past the end means the whole list is
    /// verified and the project waits for approval); on failure the cursor
    /// stays put and the per-task attempt counter grows.
    pub fn record_completion(&mut self, result: &VerificationResult) -> CompletionOutcome {
        self.iteration += 1;
        self.touch();

        if self.iteration >= self.max_iterations {
            self.status = ProjectStatus::Failed;
            return CompletionOutcome {
                next_task: None,
                status: self.status,
                should_continue: false,
            };
        }

        if result.success {
            self.current_index += 1;
            self.task_attempts = 0;

            if self.current_index >= self.tasks.len() {
                self.status = ProjectStatus::AwaitingApproval;
                return CompletionOutcome {
                    next_task: None,
                    status: self.status,
                    should_continue: false,
                };
            }

            return CompletionOutcome {
                next_task: self.next_task().cloned(),
                status: self.status,
                should_continue: true,
            };
        }

        // Failed round: same task, another attempt. The caller may still
        // override the status to PendingFix when escalating.
        self.status = ProjectStatus::Running;
        self.task_attempts += 1;
        CompletionOutcome {
            next_task: self.next_task().cloned(),
            status: self.status,
            should_continue: true,
        }
    }

    /// Inject the planner's task breakdown. Legal exactly once, while the
    /// project still waits for its plan; any later delivery is a no-op so
    /// that replayed webhooks cannot clobber a running task list.
    pub fn update_with_tasks(&mut self, tasks: Vec<Task>) -> bool {
        if self.status != ProjectStatus::PendingPlan {
            return false;
        }
        self.tasks = tasks;
        self.current_index = 0;
        self.task_attempts = 0;
        self.status = ProjectStatus::Running;
        self.touch();
        true
    }

    /// Park the project while the planner proposes a fix. Idempotent.
    pub fn set_pending_fix(&mut self) -> bool {
        if self.status == ProjectStatus::PendingFix {
            return true;
        }
        if !self.status.can_transition_to(ProjectStatus::PendingFix) {
            return false;
        }
        self.status = ProjectStatus::PendingFix;
        self.touch();
        true
    }

    /// Resume execution after a plan or fix arrived. Idempotent.
    pub fn set_running(&mut self) -> bool {
        if self.status == ProjectStatus::Running {
            return true;
        }
        if !self.status.can_transition_to(ProjectStatus::Running) {
            return false;
        }
        self.status = ProjectStatus::Running;
        self.touch();
        true
    }

    /// Final transition after human approval and a successful release.
    pub fn mark_completed(&mut self) -> bool {
        if self.status == ProjectStatus::Completed {
            return true;
        }
        if !self.status.can_transition_to(ProjectStatus::Completed) {
            return false;
        }
        self.status = ProjectStatus::Completed;
        self.touch();
        true
    }

    pub fn mark_failed(&mut self) {
        self.status = ProjectStatus::Failed;
        self.touch();
    }

    /// Record the agent run that now owns this project's current task.
    /// Supersedes any earlier run; completions for the old id become stale.
    pub fn set_current_agent_id(&mut self, agent_id: impl Into<String>) {
        self.current_agent_id = Some(agent_id.into());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn generate_project_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("proj_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}
