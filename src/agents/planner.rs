use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::error::{ForemanError, Result};
use crate::project::AgentCredentials;

use super::retry::with_retry;
use super::traits::PlannerClient;

/// HTTP client for the planning-agent gateway.
///
/// Fire-and-forget: a send only confirms delivery to the gateway. The
/// planner's answer arrives later as an independent inbound signal. A send
/// without any token configured is skipped silently, matching the optional
/// nature of the planner channel.
pub struct HttpPlannerClient {
    http: reqwest::Client,
    config: PlannerConfig,
}

impl HttpPlannerClient {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn token<'a>(&'a self, credentials: &'a AgentCredentials) -> Option<&'a str> {
        credentials
            .planner_token
            .as_deref()
            .or(self.config.token.as_deref())
            .filter(|t| !t.is_empty())
    }
}

/// Accepts http(s) URLs only. Loopback hosts are fine (the gateway usually
/// runs beside the engine); other private-range hosts are rejected to keep a
/// hijacked gateway URL from probing the internal network.
fn validate_gateway_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| {
            ForemanError::Planner(format!("gateway URL must be http(s): {}", truncate(url, 50)))
        })?;

    let host = rest
        .split(['/', '?'])
        .next()
        .unwrap_or("")
        .rsplit('@')
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();

    if host.is_empty() {
        return Err(ForemanError::Planner(String::from("gateway URL has no host")));
    }
    if host == "localhost" || host == "127.0.0.1" || host == "[::1]" {
        return Ok(());
    }
    let blocked = host.starts_with("10.")
        || host.starts_with("192.168.")
        || host.starts_with("172.")
        || host.starts_with("169.254.");
    if blocked {
        return Err(ForemanError::Planner(format!(
            "gateway URL points at a private address: {}",
            host
        )));
    }
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Gateway wake body. The `agentId` routes the wake to the planning agent;
/// without one configured the gateway falls back to its default agent.
fn wake_payload(message: &str, agent_id: Option<&str>) -> serde_json::Value {
    let mut body = json!({
        "message": message,
        "name": "Foreman",
        "wakeMode": "now",
        "deliver": true,
    });
    if let Some(agent_id) = agent_id {
        body["agentId"] = json!(agent_id);
    }
    body
}

#[async_trait]
impl PlannerClient for HttpPlannerClient {
    async fn send(&self, message: &str, credentials: &AgentCredentials) -> Result<()> {
        let Some(token) = self.token(credentials) else {
            debug!("Planner channel has no token, skipping send");
            return Ok(());
        };

        let gateway = self.config.gateway_url.trim_end_matches('/');
        if let Err(e) = validate_gateway_url(gateway) {
            warn!(error = %e, "Planner gateway URL rejected");
            return Err(e);
        }

        let body = wake_payload(message, self.config.agent_id.as_deref());

        let url = format!("{}/hooks/agent", gateway);
        with_retry("planner send", || async {
            let res = self
                .http
                .post(&url)
                .bearer_auth(token)
                .json(&body)
                .send()
                .await?;
            let status = res.status();
            if status.is_success() {
                Ok(())
            } else {
                let text = res.text().await.unwrap_or_default();
                let message = format!("planner gateway {}: {}", status, truncate(&text, 300));
                if status.is_server_error() {
                    Err(ForemanError::Timeout(message))
                } else {
                    Err(ForemanError::Planner(message))
                }
            }
        })
        .await?;

        info!(message_len = message.len(), "Message sent to planning agent");
        Ok(())
    }
}
