//! Orchestration: the initial flow that frames and triages an idea, the
//! inbound-signal grammar, and the webhook bridge that drives the
//! verify/record/dispatch loop.

mod bridge;
mod flow;
mod signals;

pub use bridge::{StartOutcome, StartRequest, WebhookBridge};
pub use flow::{run_flow, FlowInput, FlowOutcome};
pub use signals::{
    parse_approval_signal, parse_coder_signal, parse_planner_signal, ApprovalSignal,
    CoderCompletion, CoderSignal, PlannerSignal, SignalOutcome,
};
