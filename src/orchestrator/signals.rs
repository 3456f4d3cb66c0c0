//! Inbound webhook signals as tagged unions with fail-closed parsers.
//!
//! The transport layer has already authenticated and schema-validated the
//! request body; parsing here only decides which business operation the
//! payload maps to. Anything unrecognized is rejected (or deliberately
//! ignored), never a crash.

use serde::Deserialize;
use serde_json::Value;

use crate::project::Task;

/// Engine-level outcome of handling one inbound signal. The thin transport
/// maps these onto HTTP statuses: 202 for accepted and ignored, 400 for
/// invalid state or rejected shape, 404 for unknown project, 503 for an
/// unconfigured channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalOutcome {
    Accepted,
    /// Valid but irrelevant (non-terminal event, stale agent id). Senders
    /// still get a 2xx; webhooks expect best-effort acknowledgement.
    Ignored(String),
    UnknownProject(String),
    InvalidState(String),
    ChannelUnconfigured,
    Rejected(String),
}

impl SignalOutcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Accepted | Self::Ignored(_) => 202,
            Self::InvalidState(_) | Self::Rejected(_) => 400,
            Self::UnknownProject(_) => 404,
            Self::ChannelUnconfigured => 503,
        }
    }
}

/// Terminal completion report from the coding agent.
#[derive(Debug, Clone)]
pub struct CoderCompletion {
    pub agent_id: String,
    pub failed: bool,
    pub summary: Option<String>,
    /// Branch the agent pushed its work to, when different from the
    /// project's configured branch.
    pub result_branch: Option<String>,
}

/// Parsed coding-agent signal: either a terminal completion or something to
/// acknowledge and drop.
#[derive(Debug, Clone)]
pub enum CoderSignal {
    Completion(CoderCompletion),
    Ignored(String),
}

/// The coding agent reports many event kinds; only a `statusChange` to a
/// terminal status drives the pipeline. The agent id may arrive under `id`
/// or `agentId` depending on the sender's version.
pub fn parse_coder_signal(body: &Value) -> CoderSignal {
    let event = body.get("event").and_then(Value::as_str).unwrap_or("");
    if event != "statusChange" {
        return CoderSignal::Ignored(format!("event '{}' is not a status change", event));
    }

    let agent_id = body
        .get("id")
        .or_else(|| body.get("agentId"))
        .and_then(Value::as_str)
        .unwrap_or("");
    if agent_id.is_empty() {
        return CoderSignal::Ignored(String::from("status change without an agent id"));
    }

    let status = body.get("status").and_then(Value::as_str).unwrap_or("");
    let failed = match status {
        "FINISHED" => false,
        "ERROR" => true,
        other => {
            return CoderSignal::Ignored(format!("non-terminal status '{}'", other));
        }
    };

    CoderSignal::Completion(CoderCompletion {
        agent_id: agent_id.to_string(),
        failed,
        summary: body
            .get("summary")
            .and_then(Value::as_str)
            .map(str::to_string),
        result_branch: body
            .pointer("/target/branchName")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Reply from the planning agent, discriminated by its `type` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlannerSignal {
    Plan {
        #[serde(rename = "projectId")]
        project_id: String,
        tasks: Vec<Task>,
    },
    Fix {
        #[serde(rename = "projectId")]
        project_id: String,
        #[serde(rename = "fixPrompt")]
        fix_prompt: String,
    },
}

/// Fails closed: an unknown `type`, a missing field, or a non-object body
/// is an error string for the caller to surface as a 400-class outcome.
pub fn parse_planner_signal(body: &Value) -> Result<PlannerSignal, String> {
    serde_json::from_value(body.clone()).map_err(|e| format!("unrecognized planner reply: {}", e))
}

/// Human approval verdict for a project awaiting release.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalSignal {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(default = "default_approved")]
    pub approved: bool,
}

fn default_approved() -> bool {
    true
}

pub fn parse_approval_signal(body: &Value) -> Result<ApprovalSignal, String> {
    serde_json::from_value(body.clone()).map_err(|e| format!("unrecognized approval: {}", e))
}
