//! Plan request/delivery round-trip between the bridge and the planning
//! agent, including replay and misconfiguration handling.

mod common;

use common::{harness, harness_with, start, two_tasks};
use foreman::error::ForemanError;
use foreman::orchestrator::{SignalOutcome, StartRequest};
use foreman::project::{ProjectStatus, RepoRef};
use serde_json::json;

fn plan_body(project_id: &str) -> serde_json::Value {
    json!({
        "projectId": project_id,
        "type": "plan",
        "tasks": [
            { "id": "p1", "title": "Scaffold", "prompt": "scaffold the app" },
            { "id": "p2", "title": "Home screen", "prompt": "build the home screen" }
        ]
    })
}

#[tokio::test]
async fn test_plan_request_parks_project_until_plan_arrives() {
    let h = harness();
    let id = start(&h, Vec::new(), true, None).await;

    // Nothing dispatched yet; the planner holds the next move.
    assert_eq!(h.coder.launch_count(), 0);
    let project = h.registry.get(&id).unwrap();
    assert_eq!(project.status, ProjectStatus::PendingPlan);
    let message = h.planner.last_message().unwrap();
    assert!(message.contains(&format!("\"projectId\": \"{}\"", id)));
    assert!(message.contains("task breakdown"));

    // Plan delivery swaps in the planner's tasks and launches the first.
    let outcome = h.bridge.handle_planner_signal(&plan_body(&id)).await;
    assert_eq!(outcome, SignalOutcome::Accepted);

    let project = h.registry.get(&id).unwrap();
    assert_eq!(project.status, ProjectStatus::Running);
    assert_eq!(project.tasks.len(), 2);
    assert_eq!(project.tasks[0].id, "p1");
    assert_eq!(project.current_index, 0);
    assert_eq!(h.coder.last_prompt().unwrap(), "scaffold the app");
    assert_eq!(h.store.get(&id).unwrap().tasks.len(), 2);
}

#[tokio::test]
async fn test_replayed_plan_does_not_clobber_running_tasks() {
    let h = harness();
    let id = start(&h, Vec::new(), true, None).await;
    h.bridge.handle_planner_signal(&plan_body(&id)).await;

    let replay = json!({
        "projectId": id,
        "type": "plan",
        "tasks": [{ "id": "evil", "title": "Replay", "prompt": "overwrite everything" }]
    });
    let outcome = h.bridge.handle_planner_signal(&replay).await;
    assert!(matches!(outcome, SignalOutcome::InvalidState(_)));

    let project = h.registry.get(&id).unwrap();
    assert_eq!(project.tasks.len(), 2);
    assert_eq!(project.tasks[0].id, "p1");
    // Only the original plan triggered a launch.
    assert_eq!(h.coder.launch_count(), 1);
}

#[tokio::test]
async fn test_plan_for_unknown_project() {
    let h = harness();
    let outcome = h
        .bridge
        .handle_planner_signal(&plan_body("proj_missing"))
        .await;
    assert!(matches!(outcome, SignalOutcome::UnknownProject(_)));
}

#[tokio::test]
async fn test_empty_plan_is_rejected() {
    let h = harness();
    let id = start(&h, Vec::new(), true, None).await;

    let body = json!({ "projectId": id, "type": "plan", "tasks": [] });
    let outcome = h.bridge.handle_planner_signal(&body).await;
    assert!(matches!(outcome, SignalOutcome::Rejected(_)));
    assert_eq!(
        h.registry.get(&id).unwrap().status,
        ProjectStatus::PendingPlan
    );
}

#[tokio::test]
async fn test_malformed_planner_body_is_rejected() {
    let h = harness();
    let outcome = h
        .bridge
        .handle_planner_signal(&json!({ "projectId": "p", "type": "celebrate" }))
        .await;
    assert!(matches!(outcome, SignalOutcome::Rejected(_)));
    assert_eq!(outcome.status_code(), 400);
}

#[tokio::test]
async fn test_plan_without_coder_key_fails_the_project() {
    let h = harness_with(|c| c.coder.api_key = None);
    let id = start(&h, Vec::new(), true, None).await;

    let outcome = h.bridge.handle_planner_signal(&plan_body(&id)).await;
    assert_eq!(outcome, SignalOutcome::ChannelUnconfigured);
    assert_eq!(outcome.status_code(), 503);

    // The project cannot make progress without a coding channel.
    assert_eq!(h.registry.get(&id).unwrap().status, ProjectStatus::Failed);
    assert_eq!(h.coder.launch_count(), 0);
    assert!(h
        .planner
        .last_message()
        .unwrap()
        .contains("no coder API key"));
}

#[tokio::test]
async fn test_plan_request_requires_planner_channel() {
    let h = harness_with(|c| c.planner.token = None);
    let err = h
        .bridge
        .start_project(StartRequest {
            idea: String::from("todo app"),
            repository: RepoRef::new("owner/todo"),
            proposed_tasks: Vec::new(),
            mode: None,
            max_iterations: None,
            credentials: None,
            tenant: None,
            request_plan: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ForemanError::PlannerUnconfigured));
}

#[tokio::test]
async fn test_direct_start_requires_coder_key() {
    let h = harness_with(|c| c.coder.api_key = None);
    let err = h
        .bridge
        .start_project(StartRequest {
            idea: String::from("todo app"),
            repository: RepoRef::new("owner/todo"),
            proposed_tasks: two_tasks(),
            mode: None,
            max_iterations: None,
            credentials: None,
            tenant: None,
            request_plan: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ForemanError::Config(_)));
}
