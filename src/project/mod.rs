//! Project lifecycle: aggregate state, status machine, and the in-memory
//! registry.
//!
//! - `ProjectState`: one idea-to-release run with its task cursor and budget
//! - `ProjectStatus`: lifecycle statuses and allowed transitions
//! - `ProjectRegistry`: concurrent map owning every live project

mod memory;
mod registry;
mod state;
mod status;
mod types;

pub use memory::ProjectMemorySummary;
pub use registry::ProjectRegistry;
pub use state::{CompletionOutcome, ProjectState, DEFAULT_MAX_ITERATIONS};
pub use status::ProjectStatus;
pub use types::{
    AgentCredentials, ProjectSummary, RepoRef, Task, TenantFilter, TenantRef, VerificationResult,
};
