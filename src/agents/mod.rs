//! Clients for the two external agents.
//!
//! Both are specified at the interface boundary only: the coding agent
//! implements one task and reports back via webhook, the planning agent
//! receives fire-and-forget messages and replies via webhook. Transient
//! HTTP failures are retried here with bounded backoff, outside the
//! project's own iteration budget.

mod coder;
mod planner;
mod retry;
mod traits;

pub use coder::HttpCoderClient;
pub use planner::HttpPlannerClient;
pub use retry::with_retry;
pub use traits::{CoderClient, CoderRunStatus, PlannerClient};
