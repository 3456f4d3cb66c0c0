//! Write-only shadow persistence of project state.
//!
//! The in-memory registry is the source of truth; the store only exists so
//! a restart can rehydrate it. Credentials never reach the store: the
//! aggregate's serde form skips them.

mod json_store;
mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::project::ProjectState;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Writes the current state of one project. Safe to repeat; the last
    /// write wins.
    async fn upsert(&self, project: &ProjectState) -> Result<()>;

    /// Reads every persisted project, oldest first. Called once at process
    /// start to rehydrate the registry.
    async fn load_all(&self) -> Result<Vec<ProjectState>>;
}
