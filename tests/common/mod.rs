//! Hand-rolled mock collaborators for bridge-level tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use foreman::agents::{CoderClient, CoderRunStatus, PlannerClient};
use foreman::config::ForemanConfig;
use foreman::error::{ForemanError, Result};
use foreman::orchestrator::WebhookBridge;
use foreman::persistence::MemoryStore;
use foreman::project::{AgentCredentials, ProjectRegistry, RepoRef, VerificationResult};
use foreman::release::ReleaseRunner;
use foreman::verification::ProjectVerifier;

/// Records every launch and hands out sequential agent ids.
#[derive(Default)]
pub struct MockCoder {
    pub launched_prompts: Mutex<Vec<String>>,
    pub fail_launch: Mutex<bool>,
    counter: Mutex<u32>,
}

impl MockCoder {
    pub fn launch_count(&self) -> usize {
        self.launched_prompts.lock().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.launched_prompts.lock().last().cloned()
    }
}

#[async_trait]
impl CoderClient for MockCoder {
    async fn launch(
        &self,
        prompt: &str,
        _repo: &RepoRef,
        _credentials: &AgentCredentials,
    ) -> Result<String> {
        if *self.fail_launch.lock() {
            return Err(ForemanError::Coder(String::from("launch refused")));
        }
        self.launched_prompts.lock().push(prompt.to_string());
        let mut counter = self.counter.lock();
        *counter += 1;
        Ok(format!("agent-{}", counter))
    }

    async fn status(
        &self,
        _agent_id: &str,
        _credentials: &AgentCredentials,
    ) -> Result<CoderRunStatus> {
        Ok(CoderRunStatus::Running)
    }

    async fn followup(
        &self,
        _agent_id: &str,
        _prompt: &str,
        _credentials: &AgentCredentials,
    ) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct MockPlanner {
    pub messages: Mutex<Vec<String>>,
}

impl MockPlanner {
    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn last_message(&self) -> Option<String> {
        self.messages.lock().last().cloned()
    }
}

#[async_trait]
impl PlannerClient for MockPlanner {
    async fn send(&self, message: &str, _credentials: &AgentCredentials) -> Result<()> {
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

/// Replays queued verification verdicts instead of touching git or
/// subprocesses. An empty queue verifies clean.
#[derive(Default)]
pub struct StubVerifier {
    pub queued: Mutex<VecDeque<VerificationResult>>,
    pub verified_branches: Mutex<Vec<String>>,
    pub fail_acquire: Mutex<bool>,
}

impl StubVerifier {
    pub fn queue(&self, result: VerificationResult) {
        self.queued.lock().push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.verified_branches.lock().len()
    }
}

#[async_trait]
impl ProjectVerifier for StubVerifier {
    async fn acquire_and_verify(
        &self,
        _repo: &RepoRef,
        branch: &str,
        _checkout: &Path,
        _token: Option<&str>,
    ) -> Result<VerificationResult> {
        if *self.fail_acquire.lock() {
            return Err(ForemanError::Repo(String::from("clone refused")));
        }
        self.verified_branches.lock().push(branch.to_string());
        Ok(self
            .queued
            .lock()
            .pop_front()
            .unwrap_or_else(VerificationResult::ok))
    }
}

#[derive(Default)]
pub struct MockRelease {
    pub released: Mutex<Vec<String>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl ReleaseRunner for MockRelease {
    async fn execute(&self, project_id: &str, _checkout: &Path) -> Result<()> {
        if *self.fail.lock() {
            return Err(ForemanError::Release(String::from("store rejected build")));
        }
        self.released.lock().push(project_id.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub bridge: WebhookBridge,
    pub registry: Arc<ProjectRegistry>,
    pub store: Arc<MemoryStore>,
    pub coder: Arc<MockCoder>,
    pub planner: Arc<MockPlanner>,
    pub verifier: Arc<StubVerifier>,
    pub release: Arc<MockRelease>,
}

pub fn harness() -> Harness {
    harness_with(|_| {})
}

pub fn harness_with(mutate: impl FnOnce(&mut ForemanConfig)) -> Harness {
    let mut config = ForemanConfig::default();
    config.coder.api_key = Some(String::from("test-coder-key"));
    config.planner.token = Some(String::from("tok-0123456789abcdef"));
    mutate(&mut config);

    let registry = Arc::new(ProjectRegistry::new());
    let store = Arc::new(MemoryStore::new());
    let coder = Arc::new(MockCoder::default());
    let planner = Arc::new(MockPlanner::default());
    let verifier = Arc::new(StubVerifier::default());
    let release = Arc::new(MockRelease::default());

    let bridge = WebhookBridge::new(
        registry.clone(),
        store.clone(),
        coder.clone(),
        planner.clone(),
        verifier.clone(),
        release.clone(),
        config,
    );

    Harness {
        bridge,
        registry,
        store,
        coder,
        planner,
        verifier,
        release,
    }
}

pub fn completion_body(agent_id: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "event": "statusChange",
        "id": agent_id,
        "status": status,
    })
}

/// New bridge with fresh mocks over the previous harness's store, hydrated
/// the way a restarted process would be.
pub async fn harness_rehydrated(prev: &Harness) -> Harness {
    let mut config = ForemanConfig::default();
    config.coder.api_key = Some(String::from("test-coder-key"));
    config.planner.token = Some(String::from("tok-0123456789abcdef"));

    let registry = Arc::new(ProjectRegistry::new());
    let store = prev.store.clone();
    let coder = Arc::new(MockCoder::default());
    let planner = Arc::new(MockPlanner::default());
    let verifier = Arc::new(StubVerifier::default());
    let release = Arc::new(MockRelease::default());

    let bridge = WebhookBridge::new(
        registry.clone(),
        store.clone(),
        coder.clone(),
        planner.clone(),
        verifier.clone(),
        release.clone(),
        config,
    );
    bridge.hydrate().await.unwrap();

    Harness {
        bridge,
        registry,
        store,
        coder,
        planner,
        verifier,
        release,
    }
}

pub fn two_tasks() -> Vec<foreman::project::Task> {
    use foreman::project::Task;
    vec![
        Task::new("t1", "Scaffold").with_prompt("scaffold the app"),
        Task::new("t2", "Home screen").with_prompt("build the home screen"),
    ]
}

/// Starts a project in an explicit autonomy mode and returns the full
/// outcome, so callers can inspect suggest-only results too.
pub async fn start_in_mode(
    h: &Harness,
    tasks: Vec<foreman::project::Task>,
    mode: foreman::decision::AutonomyMode,
) -> foreman::orchestrator::StartOutcome {
    use foreman::orchestrator::StartRequest;

    h.bridge
        .start_project(StartRequest {
            idea: String::from("todo app"),
            repository: RepoRef::new("owner/todo"),
            proposed_tasks: tasks,
            mode: Some(mode),
            max_iterations: None,
            credentials: None,
            tenant: None,
            request_plan: false,
        })
        .await
        .unwrap()
}

/// Starts a project through the bridge and returns its id.
pub async fn start(
    h: &Harness,
    tasks: Vec<foreman::project::Task>,
    request_plan: bool,
    max_iterations: Option<u32>,
) -> String {
    use foreman::orchestrator::StartRequest;
    use foreman::project::RepoRef;

    let outcome = h
        .bridge
        .start_project(StartRequest {
            idea: String::from("todo app"),
            repository: RepoRef::new("owner/todo"),
            proposed_tasks: tasks,
            mode: None,
            max_iterations,
            credentials: None,
            tenant: None,
            request_plan,
        })
        .await
        .unwrap();
    outcome.project_id.unwrap()
}
