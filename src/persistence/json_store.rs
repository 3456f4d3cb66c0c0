use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{ForemanError, Result};
use crate::project::ProjectState;

use super::ProjectStore;

/// One JSON file per project under a state directory.
///
/// Writes go through a temp file and an atomic rename, so a crash mid-write
/// leaves either the old file or a stray `.tmp` that `init` sweeps away.
pub struct JsonFileStore {
    state_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.state_dir).await?;
        self.recover_interrupted_writes().await;
        Ok(())
    }

    fn project_path(&self, project_id: &str) -> PathBuf {
        self.state_dir.join(format!("{}.json", project_id))
    }

    async fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;

        let sync_path = tmp_path.clone();
        let synced = tokio::task::spawn_blocking(move || {
            std::fs::File::open(&sync_path).and_then(|file| file.sync_all())
        })
        .await;
        match synced {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to sync state file to disk"),
            Err(e) => warn!(error = %e, "Sync task failed"),
        }

        fs::rename(&tmp_path, path).await?;
        debug!(path = %path.display(), "State written");
        Ok(())
    }

    async fn recover_interrupted_writes(&self) {
        if let Ok(mut entries) = fs::read_dir(&self.state_dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "tmp") {
                    debug!(path = %path.display(), "Removing interrupted write");
                    let _ = fs::remove_file(&path).await;
                }
            }
        }
    }
}

#[async_trait]
impl ProjectStore for JsonFileStore {
    async fn upsert(&self, project: &ProjectState) -> Result<()> {
        let path = self.project_path(&project.id);
        let content = serde_json::to_string_pretty(project)?;
        self.write_atomic(&path, &content)
            .await
            .map_err(|e| ForemanError::StatePersistence(format!("{}: {}", project.id, e)))
    }

    async fn load_all(&self) -> Result<Vec<ProjectState>> {
        let mut projects = Vec::new();
        if !self.state_dir.exists() {
            return Ok(projects);
        }

        let mut entries = fs::read_dir(&self.state_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<ProjectState>(&content) {
                    Ok(project) => projects.push(project),
                    Err(e) => {
                        // A corrupt file must not take down rehydration.
                        warn!(path = %path.display(), error = %e, "Skipping unreadable state file");
                    }
                },
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable state file"),
            }
        }

        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(projects)
    }
}
