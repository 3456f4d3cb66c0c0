use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::CoderConfig;
use crate::error::{ForemanError, Result};
use crate::project::{AgentCredentials, RepoRef};

use super::retry::with_retry;
use super::traits::{CoderClient, CoderRunStatus};

/// HTTP client for the coding-agent API.
///
/// Authentication is HTTP Basic with the API key as username and an empty
/// password. The key comes from the per-project credentials when present,
/// otherwise from the process-wide config.
pub struct HttpCoderClient {
    http: reqwest::Client,
    config: CoderConfig,
}

#[derive(Debug, Deserialize)]
struct AgentResponse {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

impl HttpCoderClient {
    pub fn new(config: CoderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn api_key<'a>(&'a self, credentials: &'a AgentCredentials) -> Result<&'a str> {
        credentials
            .coder_api_key
            .as_deref()
            .or(self.config.api_key.as_deref())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ForemanError::Config(String::from(
                    "coder API key required: set credentials.coder_api_key or coder.api_key",
                ))
            })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = format!("coder API {}: {}", status, truncate(&body, 300));
        if status.is_server_error() {
            Err(ForemanError::Timeout(message))
        } else {
            Err(ForemanError::Coder(message))
        }
    }
}

/// Expands a short `owner/name` reference to the HTTPS form the API expects.
fn source_repository(repo: &RepoRef) -> String {
    let trimmed = repo.repository.trim_end_matches(".git");
    if trimmed.starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://github.com/{}", trimmed)
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[async_trait]
impl CoderClient for HttpCoderClient {
    async fn launch(
        &self,
        prompt: &str,
        repo: &RepoRef,
        credentials: &AgentCredentials,
    ) -> Result<String> {
        let key = self.api_key(credentials)?;

        let mut webhook = json!({});
        if let Some(url) = &self.config.webhook_url {
            webhook = json!({ "url": url });
            if let Some(secret) = &self.config.webhook_secret {
                webhook["secret"] = json!(secret);
            }
        }
        let body = json!({
            "prompt": { "text": prompt },
            "source": {
                "repository": source_repository(repo),
                "ref": repo.branch,
            },
            "webhook": webhook,
        });

        let response: AgentResponse = with_retry("coder launch", || async {
            let res = self
                .http
                .post(self.endpoint("agents"))
                .basic_auth(key, Some(""))
                .json(&body)
                .send()
                .await?;
            Ok(self.check(res).await?.json::<AgentResponse>().await?)
        })
        .await?;

        info!(agent_id = %response.id, repo = %repo, "Coding agent launched");
        Ok(response.id)
    }

    async fn status(
        &self,
        agent_id: &str,
        credentials: &AgentCredentials,
    ) -> Result<CoderRunStatus> {
        let key = self.api_key(credentials)?;
        let response: AgentResponse = with_retry("coder status", || async {
            let res = self
                .http
                .get(self.endpoint(&format!("agents/{}", agent_id)))
                .basic_auth(key, Some(""))
                .send()
                .await?;
            Ok(self.check(res).await?.json::<AgentResponse>().await?)
        })
        .await?;

        let status = CoderRunStatus::parse(response.status.as_deref().unwrap_or(""));
        debug!(agent_id, status = ?status, "Coding agent status");
        Ok(status)
    }

    async fn followup(
        &self,
        agent_id: &str,
        prompt: &str,
        credentials: &AgentCredentials,
    ) -> Result<()> {
        let key = self.api_key(credentials)?;
        let body = json!({ "prompt": { "text": prompt } });
        with_retry("coder followup", || async {
            let res = self
                .http
                .post(self.endpoint(&format!("agents/{}/followup", agent_id)))
                .basic_auth(key, Some(""))
                .json(&body)
                .send()
                .await?;
            self.check(res).await?;
            Ok(())
        })
        .await?;
        debug!(agent_id, "Follow-up delivered");
        Ok(())
    }
}
