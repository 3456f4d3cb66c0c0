use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use super::state::{CompletionOutcome, ProjectState};
use super::types::{ProjectSummary, Task, TenantFilter, VerificationResult};

/// In-memory registry owning every live `ProjectState`, keyed by project id.
///
/// Constructed once at the composition root and passed by reference into the
/// components that need it. Mutations on a single project arrive serialized
/// (one in-flight agent run per project); the lock only guards the map across
/// concurrently handled projects.
#[derive(Default)]
pub struct ProjectRegistry {
    projects: RwLock<HashMap<String, ProjectState>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, project: ProjectState) {
        debug!(project_id = %project.id, status = %project.status, "Registering project");
        self.projects.write().insert(project.id.clone(), project);
    }

    pub fn get(&self, id: &str) -> Option<ProjectState> {
        self.projects.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> Option<ProjectState> {
        self.projects.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.projects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }

    /// Run a mutation against one project under the write lock.
    pub fn update<F, R>(&self, id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut ProjectState) -> R,
    {
        self.projects.write().get_mut(id).map(f)
    }

    /// Completion signals carry only an agent id; resolve the owning project
    /// by matching the in-flight run. Stale ids match nothing.
    pub fn find_by_agent_id(&self, agent_id: &str) -> Option<ProjectState> {
        self.projects
            .read()
            .values()
            .find(|p| p.current_agent_id.as_deref() == Some(agent_id))
            .cloned()
    }

    pub fn get_next_task(&self, id: &str) -> Option<Task> {
        self.projects
            .read()
            .get(id)
            .and_then(|p| p.next_task().cloned())
    }

    pub fn record_completion(
        &self,
        id: &str,
        result: &VerificationResult,
    ) -> Option<CompletionOutcome> {
        self.update(id, |p| p.record_completion(result))
    }

    /// Returns false for unknown projects and for projects already past
    /// `pending_plan` (replayed plan deliveries).
    pub fn update_with_tasks(&self, id: &str, tasks: Vec<Task>) -> bool {
        self.update(id, |p| p.update_with_tasks(tasks)).unwrap_or(false)
    }

    pub fn set_pending_fix(&self, id: &str) -> bool {
        self.update(id, |p| p.set_pending_fix()).unwrap_or(false)
    }

    pub fn set_running(&self, id: &str) -> bool {
        self.update(id, |p| p.set_running()).unwrap_or(false)
    }

    pub fn mark_completed(&self, id: &str) -> bool {
        self.update(id, |p| p.mark_completed()).unwrap_or(false)
    }

    pub fn mark_failed(&self, id: &str) -> bool {
        self.update(id, |p| p.mark_failed()).is_some()
    }

    pub fn set_current_agent_id(&self, id: &str, agent_id: &str) -> bool {
        self.update(id, |p| p.set_current_agent_id(agent_id))
            .is_some()
    }

    /// Tenant-filtered listing, newest first. Summaries carry no prompts and
    /// no credentials; the idea text is capped for display.
    pub fn list(&self, filter: &TenantFilter) -> Vec<ProjectSummary> {
        let mut summaries: Vec<ProjectSummary> = self
            .projects
            .read()
            .values()
            .filter(|p| {
                p.tenant
                    .as_ref()
                    .map(|t| t.matches(filter))
                    .unwrap_or(filter.user_id.is_none() && filter.api_key_id.is_none())
            })
            .map(summarize)
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    /// Bulk-load persisted states at process start. Later duplicates of the
    /// same id win, matching replay order from the store.
    pub fn hydrate(&self, states: Vec<ProjectState>) {
        let mut map = self.projects.write();
        for state in states {
            map.insert(state.id.clone(), state);
        }
        debug!(count = map.len(), "Hydrated project registry");
    }
}

fn summarize(project: &ProjectState) -> ProjectSummary {
    ProjectSummary {
        id: project.id.clone(),
        idea: project.idea.chars().take(100).collect(),
        status: project.status.to_string(),
        repository: project.repository.clone(),
        task_count: project.tasks.len(),
        current_index: project.current_index,
        iteration: project.iteration,
        max_iterations: project.max_iterations,
        created_at: project.created_at,
        updated_at: project.updated_at,
    }
}
