use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::project::ProjectState;

use super::ProjectStore;

/// In-memory store for tests and ephemeral runs. Contents vanish with the
/// process, so rehydration restores nothing.
#[derive(Default)]
pub struct MemoryStore {
    projects: Mutex<HashMap<String, ProjectState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.projects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.lock().is_empty()
    }

    pub fn get(&self, project_id: &str) -> Option<ProjectState> {
        self.projects.lock().get(project_id).cloned()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn upsert(&self, project: &ProjectState) -> Result<()> {
        self.projects
            .lock()
            .insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<ProjectState>> {
        let mut projects: Vec<ProjectState> = self.projects.lock().values().cloned().collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }
}
