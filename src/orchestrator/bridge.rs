//! Completion handling: the reactive half of the orchestration loop.
//!
//! Every inbound signal lands here after transport-level auth and schema
//! validation. The bridge resolves the owning project, drives verification,
//! applies the state machine, consults the retry strategy, and dispatches
//! the next unit of work to whichever agent should act. Expected business
//! outcomes (failed verification, spent budget, stale ids) are values, not
//! errors; persistence failures are logged and absorbed because idempotent
//! webhook redelivery is the recovery mechanism.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::agents::{CoderClient, PlannerClient};
use crate::config::ForemanConfig;
use crate::decision::{AutonomyMode, DecisionResult, Phase};
use crate::error::{ForemanError, Result};
use crate::outcome::OutcomeBlueprint;
use crate::persistence::ProjectStore;
use crate::project::{
    AgentCredentials, ProjectRegistry, ProjectState, ProjectStatus, RepoRef, Task, TenantRef,
};
use crate::recovery::{analyze_failure, fallback_fix_prompt, RetryAction};
use crate::release::ReleaseRunner;
use crate::verification::ProjectVerifier;

use super::flow::{run_flow, FlowInput};
use super::signals::{
    parse_approval_signal, parse_coder_signal, parse_planner_signal, CoderCompletion, CoderSignal,
    PlannerSignal, SignalOutcome,
};

pub struct WebhookBridge {
    registry: Arc<ProjectRegistry>,
    store: Arc<dyn ProjectStore>,
    coder: Arc<dyn CoderClient>,
    planner: Arc<dyn PlannerClient>,
    verifier: Arc<dyn ProjectVerifier>,
    release: Arc<dyn ReleaseRunner>,
    config: ForemanConfig,
}

/// Request to start one idea-to-release run.
pub struct StartRequest {
    pub idea: String,
    pub repository: RepoRef,
    pub proposed_tasks: Vec<Task>,
    pub mode: Option<AutonomyMode>,
    pub max_iterations: Option<u32>,
    pub credentials: Option<AgentCredentials>,
    pub tenant: Option<TenantRef>,
    /// Ask the planning agent for a task breakdown first instead of
    /// dispatching the triaged tasks directly.
    pub request_plan: bool,
}

#[derive(Debug)]
pub struct StartOutcome {
    /// Absent when the decision engine rejected the whole proposal.
    pub project_id: Option<String>,
    pub blueprint: OutcomeBlueprint,
    pub decision: DecisionResult,
}

impl WebhookBridge {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ProjectRegistry>,
        store: Arc<dyn ProjectStore>,
        coder: Arc<dyn CoderClient>,
        planner: Arc<dyn PlannerClient>,
        verifier: Arc<dyn ProjectVerifier>,
        release: Arc<dyn ReleaseRunner>,
        config: ForemanConfig,
    ) -> Self {
        Self {
            registry,
            store,
            coder,
            planner,
            verifier,
            release,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<ProjectRegistry> {
        &self.registry
    }

    /// Rehydrates the registry from the persistence collaborator. Called
    /// once at process start.
    pub async fn hydrate(&self) -> Result<usize> {
        let states = self.store.load_all().await?;
        let count = states.len();
        self.registry.hydrate(states);
        Ok(count)
    }

    /// Runs the orchestration flow and performs the first dispatch.
    pub async fn start_project(&self, request: StartRequest) -> Result<StartOutcome> {
        let mode = match request.mode {
            Some(mode) => mode,
            None => self.config.orchestrator.default_mode.parse()?,
        };

        let flow = run_flow(
            FlowInput {
                idea: request.idea.clone(),
                proposed_tasks: request.proposed_tasks,
                mode,
            },
            None,
        );

        if !flow.should_proceed {
            info!(idea_len = request.idea.len(), "Proposal rejected by decision engine");
            return Ok(StartOutcome {
                project_id: None,
                blueprint: flow.blueprint,
                decision: flow.decision,
            });
        }

        // Assist mode proposes and stops: the triaged plan goes back to the
        // caller and no project is created, nothing is dispatched.
        if mode.suggest_only() {
            info!(
                approved = flow.decision.approved_tasks.len(),
                "Assist mode: returning suggestions without dispatch"
            );
            return Ok(StartOutcome {
                project_id: None,
                blueprint: flow.blueprint,
                decision: flow.decision,
            });
        }

        let initial_status = if request.request_plan {
            ProjectStatus::PendingPlan
        } else {
            ProjectStatus::Running
        };
        let mut project = ProjectState::new(request.idea.clone(), request.repository)
            .with_tasks(flow.decision.approved_tasks.clone())
            .with_status(initial_status)
            .with_mode(mode)
            .with_max_iterations(
                request
                    .max_iterations
                    .unwrap_or(self.config.orchestrator.max_iterations),
            );
        if let Some(credentials) = request.credentials {
            project = project.with_credentials(credentials);
        }
        if let Some(tenant) = request.tenant {
            project = project.with_tenant(tenant);
        }

        let credentials = self.effective_credentials(&project);
        let project_id = project.id.clone();

        if request.request_plan {
            if !credentials.has_planner_channel() {
                return Err(ForemanError::PlannerUnconfigured);
            }
            self.registry.insert(project);
            self.persist(&project_id).await;
            self.planner
                .send(&plan_request_message(&project_id, &request.idea), &credentials)
                .await?;
            info!(project_id = %project_id, "Plan requested from planning agent");
        } else {
            if !credentials.has_coder_key() {
                return Err(ForemanError::Config(String::from(
                    "coder API key required to start without a plan request",
                )));
            }
            let first_prompt = project
                .next_task()
                .map(|t| t.prompt.clone())
                .ok_or_else(|| ForemanError::Other(String::from("no approved task to dispatch")))?;
            self.registry.insert(project);
            if let Err(e) = self.dispatch(&project_id, &first_prompt, &credentials).await {
                self.registry.update(&project_id, |p| p.mark_failed());
                self.persist(&project_id).await;
                return Err(e);
            }
            self.persist(&project_id).await;
        }

        Ok(StartOutcome {
            project_id: Some(project_id),
            blueprint: flow.blueprint,
            decision: flow.decision,
        })
    }

    /// Entry point for coding-agent webhooks.
    pub async fn handle_coder_signal(&self, body: &Value) -> SignalOutcome {
        match parse_coder_signal(body) {
            CoderSignal::Completion(completion) => self.handle_completion(completion).await,
            CoderSignal::Ignored(reason) => {
                info!(reason = %reason, "Coder signal acknowledged and dropped");
                SignalOutcome::Ignored(reason)
            }
        }
    }

    async fn handle_completion(&self, completion: CoderCompletion) -> SignalOutcome {
        // Resolve the owner by the in-flight run id. A superseded or unknown
        // id matches nothing and is dropped without error.
        let Some(project) = self.registry.find_by_agent_id(&completion.agent_id) else {
            info!(agent_id = %completion.agent_id, "Completion for unknown or superseded agent run");
            return SignalOutcome::Ignored(format!(
                "no project owns agent run {}",
                completion.agent_id
            ));
        };
        let project_id = project.id.clone();
        let Some(task) = project.next_task().cloned() else {
            warn!(project_id = %project_id, "Completion arrived with no current task");
            return SignalOutcome::Ignored(String::from("no current task"));
        };

        info!(
            project_id = %project_id,
            agent_id = %completion.agent_id,
            agent_failed = completion.failed,
            summary_len = completion.summary.as_deref().map(str::len).unwrap_or(0),
            "Coding agent finished, verifying"
        );

        let credentials = self.effective_credentials(&project);
        let branch = completion
            .result_branch
            .as_deref()
            .unwrap_or(&project.repository.branch);
        let checkout = self.checkout_dir(&project_id);

        let result = match self
            .verifier
            .acquire_and_verify(
                &project.repository,
                branch,
                &checkout,
                credentials.github_token.as_deref(),
            )
            .await
        {
            Ok(result) => result,
            Err(e) => {
                error!(project_id = %project_id, error = %e, "Repository acquisition failed");
                self.notify_planner(
                    &format!("Repository error for {}: {}", project_id, e),
                    &credentials,
                )
                .await;
                return SignalOutcome::Accepted;
            }
        };

        let Some(outcome) = self.registry.record_completion(&project_id, &result) else {
            return SignalOutcome::UnknownProject(project_id);
        };
        self.persist(&project_id).await;

        match outcome.status {
            ProjectStatus::AwaitingApproval => {
                // Autopilot releases unattended; every other mode parks here
                // until a human approves the deployment.
                if !project.mode.requires_approval(Phase::Deployment) && project.mode.auto_release()
                {
                    self.run_release(&project_id, &credentials).await;
                    return SignalOutcome::Accepted;
                }
                self.notify_planner(
                    &format!(
                        "All tasks verified for {}. Awaiting approval: reply with {{\"projectId\": \"{}\", \"approved\": true}}",
                        project_id, project_id
                    ),
                    &credentials,
                )
                .await;
                return SignalOutcome::Accepted;
            }
            ProjectStatus::Failed => {
                self.notify_planner(
                    &format!("Project {} failed: iteration budget exhausted", project_id),
                    &credentials,
                )
                .await;
                return SignalOutcome::Accepted;
            }
            _ => {}
        }
        if !outcome.should_continue {
            return SignalOutcome::Accepted;
        }

        if result.success {
            // Next task in the approved list.
            if let Some(next) = outcome.next_task {
                if let Err(e) = self.dispatch(&project_id, &next.prompt, &credentials).await {
                    self.report_dispatch_failure(&project_id, &credentials, &e).await;
                }
                self.persist(&project_id).await;
            }
            return SignalOutcome::Accepted;
        }

        self.handle_verification_failure(&project_id, &task, &result, &credentials)
            .await
    }

    async fn handle_verification_failure(
        &self,
        project_id: &str,
        task: &Task,
        result: &crate::project::VerificationResult,
        credentials: &AgentCredentials,
    ) -> SignalOutcome {
        let (attempts, mode) = self
            .registry
            .get(project_id)
            .map(|p| (p.task_attempts, p.mode))
            .unwrap_or((1, AutonomyMode::default()));
        let analysis = analyze_failure(
            &result.errors,
            result.stderr.as_deref(),
            &task.prompt,
            attempts,
        );
        // The mode's unattended-fix budget caps the category's own retry
        // budget: once it is spent the failure escalates early.
        let action = if analysis.action() == RetryAction::Retry && attempts >= mode.max_auto_fixes()
        {
            RetryAction::Escalate
        } else {
            analysis.action()
        };
        info!(
            project_id,
            category = %analysis.category,
            action = %action,
            attempts,
            mode = %mode,
            "Verification failed, triaged"
        );

        match action {
            RetryAction::Abort => {
                self.registry.mark_failed(project_id);
                self.persist(project_id).await;
                self.notify_planner(
                    &format!(
                        "Project {} aborted: {} failure is not fixable by retry. {}",
                        project_id, analysis.category, analysis.root_cause_hint
                    ),
                    credentials,
                )
                .await;
                SignalOutcome::Accepted
            }
            RetryAction::Escalate if credentials.has_planner_channel() => {
                self.registry.set_pending_fix(project_id);
                self.persist(project_id).await;
                self.planner_best_effort(
                    &fix_request_message(project_id, &result.errors, &task.prompt),
                    credentials,
                )
                .await;
                SignalOutcome::Accepted
            }
            // Escalation without a planner channel falls back to one more
            // direct retry with the templated fix prompt.
            RetryAction::Escalate | RetryAction::Retry => {
                let prompt = analysis
                    .suggested_prompt
                    .unwrap_or_else(|| fallback_fix_prompt(task, &result.errors));
                if let Err(e) = self.dispatch(project_id, &prompt, credentials).await {
                    self.report_dispatch_failure(project_id, credentials, &e).await;
                }
                self.persist(project_id).await;
                SignalOutcome::Accepted
            }
        }
    }

    /// Entry point for planning-agent webhooks: either a plan or a fix.
    pub async fn handle_planner_signal(&self, body: &Value) -> SignalOutcome {
        let signal = match parse_planner_signal(body) {
            Ok(signal) => signal,
            Err(reason) => {
                warn!(reason = %reason, "Planner reply rejected");
                return SignalOutcome::Rejected(reason);
            }
        };
        match signal {
            PlannerSignal::Plan { project_id, tasks } => self.handle_plan(&project_id, tasks).await,
            PlannerSignal::Fix {
                project_id,
                fix_prompt,
            } => self.handle_fix(&project_id, &fix_prompt).await,
        }
    }

    async fn handle_plan(&self, project_id: &str, tasks: Vec<Task>) -> SignalOutcome {
        let Some(project) = self.registry.get(project_id) else {
            return SignalOutcome::UnknownProject(project_id.to_string());
        };
        if tasks.is_empty() {
            return SignalOutcome::Rejected(String::from("plan contained no tasks"));
        }

        // Replayed plan delivery against a project already running is a
        // documented no-op; the transport reports it as an invalid state.
        if !self.registry.update_with_tasks(project_id, tasks) {
            info!(project_id, status = %project.status, "Plan replay ignored");
            return SignalOutcome::InvalidState(format!(
                "plan can only be applied while pending_plan, project is {}",
                project.status
            ));
        }
        self.persist(project_id).await;

        let credentials = self.effective_credentials(&project);
        if !credentials.has_coder_key() {
            self.registry.mark_failed(project_id);
            self.persist(project_id).await;
            self.notify_planner(
                &format!(
                    "Plan received for {}, but no coder API key is configured. Add credentials and restart the project.",
                    project_id
                ),
                &credentials,
            )
            .await;
            return SignalOutcome::ChannelUnconfigured;
        }

        let Some(first) = self.registry.get_next_task(project_id) else {
            return SignalOutcome::Rejected(String::from("plan contained no dispatchable task"));
        };
        match self.dispatch(project_id, &first.prompt, &credentials).await {
            Ok(()) => {
                self.persist(project_id).await;
                self.planner_best_effort(
                    &format!("Plan received, coding agent launched for {}", project_id),
                    &credentials,
                )
                .await;
                SignalOutcome::Accepted
            }
            Err(e) => {
                self.registry.mark_failed(project_id);
                self.persist(project_id).await;
                self.report_dispatch_failure(project_id, &credentials, &e).await;
                SignalOutcome::Accepted
            }
        }
    }

    async fn handle_fix(&self, project_id: &str, fix_prompt: &str) -> SignalOutcome {
        let Some(project) = self.registry.get(project_id) else {
            return SignalOutcome::UnknownProject(project_id.to_string());
        };
        if project.status != ProjectStatus::PendingFix {
            return SignalOutcome::InvalidState(format!(
                "no fix pending, project is {}",
                project.status
            ));
        }
        if fix_prompt.trim().is_empty() {
            return SignalOutcome::Rejected(String::from("fix prompt is empty"));
        }

        self.registry.set_running(project_id);
        let credentials = self.effective_credentials(&project);
        match self.dispatch(project_id, fix_prompt, &credentials).await {
            Ok(()) => {
                self.persist(project_id).await;
                info!(project_id, "Fix instruction dispatched to coding agent");
                SignalOutcome::Accepted
            }
            Err(e) => {
                self.persist(project_id).await;
                self.report_dispatch_failure(project_id, &credentials, &e).await;
                SignalOutcome::Accepted
            }
        }
    }

    /// Entry point for the human approval step.
    pub async fn handle_approval(&self, body: &Value) -> SignalOutcome {
        let approval = match parse_approval_signal(body) {
            Ok(approval) => approval,
            Err(reason) => return SignalOutcome::Rejected(reason),
        };
        let Some(project) = self.registry.get(&approval.project_id) else {
            return SignalOutcome::UnknownProject(approval.project_id);
        };
        if project.status != ProjectStatus::AwaitingApproval {
            return SignalOutcome::InvalidState(format!(
                "approval requires awaiting_approval, project is {}",
                project.status
            ));
        }

        let credentials = self.effective_credentials(&project);
        if !approval.approved {
            info!(project_id = %project.id, "Approval declined, project stays parked");
            self.planner_best_effort(
                &format!("Approval declined for {}", project.id),
                &credentials,
            )
            .await;
            return SignalOutcome::Accepted;
        }

        self.run_release(&project.id, &credentials).await;
        SignalOutcome::Accepted
    }

    /// Executes the release and completes the project. On failure the
    /// project stays awaiting approval so the step can be retried.
    async fn run_release(&self, project_id: &str, credentials: &AgentCredentials) {
        let checkout = self.checkout_dir(project_id);
        if let Err(e) = self.release.execute(project_id, &checkout).await {
            error!(project_id, error = %e, "Release failed");
            self.notify_planner(
                &format!("Release failed for {}: {}", project_id, e),
                credentials,
            )
            .await;
            return;
        }

        self.registry.mark_completed(project_id);
        self.persist(project_id).await;
        info!(project_id, "Project released and completed");
        self.planner_best_effort(
            &format!("Project {} released and completed", project_id),
            credentials,
        )
        .await;
    }

    /// Launches a coding-agent run and records its id as the project's
    /// in-flight run, superseding any earlier one.
    async fn dispatch(
        &self,
        project_id: &str,
        prompt: &str,
        credentials: &AgentCredentials,
    ) -> Result<()> {
        let repository = self
            .registry
            .get(project_id)
            .map(|p| p.repository)
            .ok_or_else(|| ForemanError::ProjectNotFound(project_id.to_string()))?;
        let agent_id = self.coder.launch(prompt, &repository, credentials).await?;
        self.registry.set_current_agent_id(project_id, &agent_id);
        info!(project_id, agent_id = %agent_id, prompt_len = prompt.len(), "Dispatched to coding agent");
        Ok(())
    }

    fn effective_credentials(&self, project: &ProjectState) -> AgentCredentials {
        let mut credentials = self.config.credentials();
        if let Some(overrides) = &project.credentials_override {
            if overrides.coder_api_key.is_some() {
                credentials.coder_api_key = overrides.coder_api_key.clone();
            }
            if overrides.planner_token.is_some() {
                credentials.planner_token = overrides.planner_token.clone();
            }
            if overrides.github_token.is_some() {
                credentials.github_token = overrides.github_token.clone();
            }
        }
        credentials
    }

    fn checkout_dir(&self, project_id: &str) -> PathBuf {
        self.config.orchestrator.work_dir.join(project_id)
    }

    /// Shadow-copy write; failures are logged, not propagated. Redelivered
    /// webhooks regenerate the same state.
    async fn persist(&self, project_id: &str) {
        if let Some(state) = self.registry.get(project_id) {
            if let Err(e) = self.store.upsert(&state).await {
                warn!(project_id, error = %e, "State persistence failed");
            }
        }
    }

    async fn notify_planner(&self, message: &str, credentials: &AgentCredentials) {
        self.planner_best_effort(message, credentials).await;
    }

    async fn planner_best_effort(&self, message: &str, credentials: &AgentCredentials) {
        if let Err(e) = self.planner.send(message, credentials).await {
            warn!(error = %e, "Planner notification failed");
        }
    }

    async fn report_dispatch_failure(
        &self,
        project_id: &str,
        credentials: &AgentCredentials,
        error: &ForemanError,
    ) {
        error!(project_id, error = %error, "Failed to launch coding agent");
        self.planner_best_effort(
            &format!("Coding agent failed to launch for {}: {}", project_id, error),
            credentials,
        )
        .await;
    }
}

fn plan_request_message(project_id: &str, idea: &str) -> String {
    format!(
        "Research this app idea and produce a task breakdown. Reply via webhook with \
         {{\"projectId\": \"{}\", \"type\": \"plan\", \"tasks\": [{{\"id\": \"task_1\", \
         \"title\": \"...\", \"description\": \"...\", \"prompt\": \"...\"}}]}}. \
         Each prompt must be a concrete, self-contained instruction for an Expo/React Native \
         coding agent. Idea: {}",
        project_id, idea
    )
}

fn fix_request_message(project_id: &str, errors: &[String], task_prompt: &str) -> String {
    let quoted: Vec<&str> = errors.iter().map(String::as_str).take(5).collect();
    format!(
        "Verification failed for {}. Research a fix and reply via webhook with \
         {{\"projectId\": \"{}\", \"type\": \"fix\", \"fixPrompt\": \"...\"}}.\n\n\
         Task context: {}\n\nErrors:\n{}",
        project_id,
        project_id,
        task_prompt,
        quoted.join("\n")
    )
}
