//! End-to-end loop through the webhook bridge with mocked agents: dispatch,
//! completion, verification, approval, release.

mod common;

use common::{completion_body, harness, start, two_tasks};
use foreman::orchestrator::SignalOutcome;
use foreman::project::{ProjectStatus, Task};
use serde_json::json;

#[tokio::test]
async fn test_two_task_run_to_completion() {
    let h = harness();
    let id = start(&h, two_tasks(), false, None).await;

    // First task was dispatched at start.
    assert_eq!(h.coder.launch_count(), 1);
    assert_eq!(h.coder.last_prompt().unwrap(), "scaffold the app");
    let project = h.registry.get(&id).unwrap();
    assert_eq!(project.status, ProjectStatus::Running);
    assert_eq!(project.current_agent_id.as_deref(), Some("agent-1"));

    // Clean verification advances to the second task.
    let outcome = h
        .bridge
        .handle_coder_signal(&completion_body("agent-1", "FINISHED"))
        .await;
    assert_eq!(outcome, SignalOutcome::Accepted);
    assert_eq!(h.coder.launch_count(), 2);
    assert_eq!(h.coder.last_prompt().unwrap(), "build the home screen");
    let project = h.registry.get(&id).unwrap();
    assert_eq!(project.current_index, 1);
    assert_eq!(project.iteration, 1);

    // Last task verified: parked for approval, planner is told how to reply.
    let outcome = h
        .bridge
        .handle_coder_signal(&completion_body("agent-2", "FINISHED"))
        .await;
    assert_eq!(outcome, SignalOutcome::Accepted);
    let project = h.registry.get(&id).unwrap();
    assert_eq!(project.status, ProjectStatus::AwaitingApproval);
    assert!(h.planner.last_message().unwrap().contains("Awaiting approval"));
    assert_eq!(h.coder.launch_count(), 2);

    // Approval triggers the release and completes the project.
    let outcome = h
        .bridge
        .handle_approval(&json!({ "projectId": id }))
        .await;
    assert_eq!(outcome, SignalOutcome::Accepted);
    assert_eq!(h.release.released.lock().as_slice(), [id.clone()]);
    let project = h.registry.get(&id).unwrap();
    assert_eq!(project.status, ProjectStatus::Completed);

    // The persisted shadow copy tracks the final state.
    assert_eq!(h.store.get(&id).unwrap().status, ProjectStatus::Completed);
}

#[tokio::test]
async fn test_stale_agent_id_is_dropped_without_verification() {
    let h = harness();
    let id = start(&h, two_tasks(), false, None).await;

    h.bridge
        .handle_coder_signal(&completion_body("agent-1", "FINISHED"))
        .await;
    assert_eq!(h.verifier.call_count(), 1);

    // agent-2 now owns the project; a replayed completion for agent-1 is
    // acknowledged and dropped without touching the pipeline.
    let outcome = h
        .bridge
        .handle_coder_signal(&completion_body("agent-1", "FINISHED"))
        .await;
    assert!(matches!(outcome, SignalOutcome::Ignored(_)));
    assert_eq!(outcome.status_code(), 202);
    assert_eq!(h.verifier.call_count(), 1);
    assert_eq!(h.registry.get(&id).unwrap().iteration, 1);
}

#[tokio::test]
async fn test_unknown_agent_id_is_dropped() {
    let h = harness();
    start(&h, two_tasks(), false, None).await;

    let outcome = h
        .bridge
        .handle_coder_signal(&completion_body("agent-99", "FINISHED"))
        .await;
    assert!(matches!(outcome, SignalOutcome::Ignored(_)));
    assert_eq!(h.verifier.call_count(), 0);
}

#[tokio::test]
async fn test_iteration_budget_exhaustion_fails_even_on_success() {
    let h = harness();
    let id = start(&h, two_tasks(), false, Some(1)).await;

    let outcome = h
        .bridge
        .handle_coder_signal(&completion_body("agent-1", "FINISHED"))
        .await;
    assert_eq!(outcome, SignalOutcome::Accepted);

    let project = h.registry.get(&id).unwrap();
    assert_eq!(project.status, ProjectStatus::Failed);
    assert!(h
        .planner
        .last_message()
        .unwrap()
        .contains("iteration budget exhausted"));
    // No further dispatch after the budget is spent.
    assert_eq!(h.coder.launch_count(), 1);
}

#[tokio::test]
async fn test_result_branch_overrides_project_branch() {
    let h = harness();
    start(&h, two_tasks(), false, None).await;

    let body = json!({
        "event": "statusChange",
        "id": "agent-1",
        "status": "FINISHED",
        "target": { "branchName": "cursor/scaffold" }
    });
    h.bridge.handle_coder_signal(&body).await;
    assert_eq!(h.verifier.verified_branches.lock().as_slice(), ["cursor/scaffold"]);

    // Without a result branch the configured branch is verified.
    h.bridge
        .handle_coder_signal(&completion_body("agent-2", "FINISHED"))
        .await;
    assert_eq!(h.verifier.verified_branches.lock()[1], "main");
}

#[tokio::test]
async fn test_repository_acquisition_failure_leaves_project_intact() {
    let h = harness();
    let id = start(&h, two_tasks(), false, None).await;
    *h.verifier.fail_acquire.lock() = true;

    let outcome = h
        .bridge
        .handle_coder_signal(&completion_body("agent-1", "FINISHED"))
        .await;
    assert_eq!(outcome, SignalOutcome::Accepted);

    // The round never happened: no iteration consumed, planner informed.
    let project = h.registry.get(&id).unwrap();
    assert_eq!(project.iteration, 0);
    assert_eq!(project.status, ProjectStatus::Running);
    assert!(h.planner.last_message().unwrap().contains("Repository error"));
}

#[tokio::test]
async fn test_declined_approval_keeps_project_parked() {
    let h = harness();
    let id = start(
        &h,
        vec![Task::new("t1", "Scaffold").with_prompt("scaffold the app")],
        false,
        None,
    )
    .await;
    h.bridge
        .handle_coder_signal(&completion_body("agent-1", "FINISHED"))
        .await;
    assert_eq!(
        h.registry.get(&id).unwrap().status,
        ProjectStatus::AwaitingApproval
    );

    let outcome = h
        .bridge
        .handle_approval(&json!({ "projectId": id, "approved": false }))
        .await;
    assert_eq!(outcome, SignalOutcome::Accepted);
    assert!(h.release.released.lock().is_empty());
    assert_eq!(
        h.registry.get(&id).unwrap().status,
        ProjectStatus::AwaitingApproval
    );
}

#[tokio::test]
async fn test_release_failure_is_retryable() {
    let h = harness();
    let id = start(
        &h,
        vec![Task::new("t1", "Scaffold").with_prompt("scaffold the app")],
        false,
        None,
    )
    .await;
    h.bridge
        .handle_coder_signal(&completion_body("agent-1", "FINISHED"))
        .await;

    *h.release.fail.lock() = true;
    h.bridge.handle_approval(&json!({ "projectId": id })).await;
    assert_eq!(
        h.registry.get(&id).unwrap().status,
        ProjectStatus::AwaitingApproval
    );
    assert!(h.planner.last_message().unwrap().contains("Release failed"));

    // A second approval after the release channel recovers completes the run.
    *h.release.fail.lock() = false;
    h.bridge.handle_approval(&json!({ "projectId": id })).await;
    assert_eq!(h.registry.get(&id).unwrap().status, ProjectStatus::Completed);
}

#[tokio::test]
async fn test_approval_outside_awaiting_state_is_invalid() {
    let h = harness();
    let id = start(&h, two_tasks(), false, None).await;

    let outcome = h
        .bridge
        .handle_approval(&json!({ "projectId": id }))
        .await;
    assert!(matches!(outcome, SignalOutcome::InvalidState(_)));
    assert_eq!(outcome.status_code(), 400);

    let outcome = h
        .bridge
        .handle_approval(&json!({ "projectId": "proj_missing" }))
        .await;
    assert!(matches!(outcome, SignalOutcome::UnknownProject(_)));
    assert_eq!(outcome.status_code(), 404);
}

#[tokio::test]
async fn test_rejected_proposal_creates_no_project() {
    use foreman::orchestrator::StartRequest;
    use foreman::project::RepoRef;

    let h = harness();
    let outcome = h
        .bridge
        .start_project(StartRequest {
            idea: String::new(),
            repository: RepoRef::new("owner/todo"),
            proposed_tasks: Vec::new(),
            mode: None,
            max_iterations: None,
            credentials: None,
            tenant: None,
            request_plan: false,
        })
        .await
        .unwrap();

    assert!(outcome.project_id.is_none());
    assert!(!outcome.decision.rejected_reasons.is_empty());
    assert_eq!(h.coder.launch_count(), 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn test_hydrate_restores_persisted_projects() {
    let h = harness();
    let id = start(&h, two_tasks(), false, None).await;
    h.bridge
        .handle_coder_signal(&completion_body("agent-1", "FINISHED"))
        .await;

    // A fresh bridge over the same store picks the project back up, and the
    // recorded agent id still routes completions.
    let h2 = common::harness_rehydrated(&h).await;
    let project = h2.registry.get(&id).unwrap();
    assert_eq!(project.current_index, 1);
    assert_eq!(project.current_agent_id.as_deref(), Some("agent-2"));

    let outcome = h2
        .bridge
        .handle_coder_signal(&completion_body("agent-2", "FINISHED"))
        .await;
    assert_eq!(outcome, SignalOutcome::Accepted);
    assert_eq!(
        h2.registry.get(&id).unwrap().status,
        ProjectStatus::AwaitingApproval
    );
}
