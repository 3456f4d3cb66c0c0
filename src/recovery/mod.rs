//! Failure triage: classify raw verification output into a category, then
//! decide retry, escalate, or abort under a per-category attempt budget.

mod classifier;
mod strategy;
mod types;

pub use classifier::classify_failure;
pub use strategy::{analyze_failure, fallback_fix_prompt};
pub use types::{FailureAnalysis, FailureCategory, RetryAction, RetryDecision};
