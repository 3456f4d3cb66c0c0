use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::error::{ForemanError, Result};

/// Top-level configuration, one section per subsystem.
///
/// Loaded from `config.toml` when present, otherwise defaults; environment
/// variables override individual fields last so deployments can keep secrets
/// out of the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForemanConfig {
    pub orchestrator: OrchestratorConfig,
    pub verification: VerificationConfig,
    pub coder: CoderConfig,
    pub planner: PlannerConfig,
    pub git: GitConfig,
    pub release: ReleaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Per-project iteration budget; the only bound on retry loops.
    pub max_iterations: u32,
    pub default_mode: String,
    /// Root for per-project checkouts.
    pub work_dir: PathBuf,
    /// Directory for persisted project state files.
    pub state_dir: PathBuf,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            default_mode: String::from("builder"),
            work_dir: std::env::temp_dir().join("foreman"),
            state_dir: PathBuf::from(".foreman/projects"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Project manifest that must exist before any command runs.
    pub manifest: String,
    /// App manifest whose presence enables the doctor step.
    pub app_manifest: String,
    pub install_cmd: String,
    pub lint_cmd: String,
    pub test_cmd: String,
    pub doctor_cmd: String,
    /// Wall-clock budget per command in milliseconds.
    pub timeout_ms: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            manifest: String::from("package.json"),
            app_manifest: String::from("app.json"),
            install_cmd: String::from("bun install"),
            lint_cmd: String::from("bun run lint"),
            test_cmd: String::from("bun test"),
            doctor_cmd: String::from("npx expo-doctor"),
            timeout_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Where the coding agent should deliver its completion signal.
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.cursor.com/v0"),
            api_key: None,
            webhook_url: None,
            webhook_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub gateway_url: String,
    pub token: Option<String>,
    /// Gateway-side id of the planning agent the wake is routed to.
    pub agent_id: Option<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            gateway_url: String::from("http://127.0.0.1:18789"),
            token: None,
            agent_id: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Access token embedded into clone URLs; never logged.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    pub enabled: bool,
    pub command: String,
    pub timeout_secs: u64,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: String::from(
                "eas build --platform ios --profile production --auto-submit --non-interactive",
            ),
            timeout_secs: 600,
        }
    }
}

impl ForemanConfig {
    pub async fn load(config_path: &Path) -> Result<Self> {
        let mut config: Self = if config_path.exists() {
            let content = fs::read_to_string(config_path).await?;
            debug!(path = %config_path.display(), "Loaded configuration file");
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, config_path: &Path) -> Result<()> {
        self.validate()?;
        let content =
            toml::to_string_pretty(self).map_err(|e| ForemanError::Config(e.to_string()))?;
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(config_path, content).await?;
        Ok(())
    }

    /// Environment variables win over file values. Secrets are expected to
    /// arrive this way rather than through config.toml.
    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u32>("FOREMAN_MAX_ITERATIONS") {
            self.orchestrator.max_iterations = v;
        }
        if let Some(v) = env_string("FOREMAN_WORK_DIR") {
            self.orchestrator.work_dir = PathBuf::from(v);
        }
        if let Some(v) = env_string("FOREMAN_STATE_DIR") {
            self.orchestrator.state_dir = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<u64>("FOREMAN_VERIFICATION_TIMEOUT_MS") {
            self.verification.timeout_ms = v;
        }
        if let Some(v) = env_string("FOREMAN_CODER_BASE_URL") {
            self.coder.base_url = v;
        }
        if let Some(v) = env_string("FOREMAN_CODER_API_KEY") {
            self.coder.api_key = Some(v);
        }
        if let Some(v) = env_string("FOREMAN_CODER_WEBHOOK_URL") {
            self.coder.webhook_url = Some(v);
        }
        if let Some(v) = env_string("FOREMAN_CODER_WEBHOOK_SECRET") {
            self.coder.webhook_secret = Some(v);
        }
        if let Some(v) = env_string("FOREMAN_PLANNER_GATEWAY_URL") {
            self.planner.gateway_url = v;
        }
        if let Some(v) = env_string("FOREMAN_PLANNER_TOKEN") {
            self.planner.token = Some(v);
        }
        if let Some(v) = env_string("FOREMAN_PLANNER_AGENT_ID") {
            self.planner.agent_id = Some(v);
        }
        if let Some(v) = env_string("FOREMAN_GITHUB_TOKEN") {
            self.git.token = Some(v);
        }
    }

    /// Validates configuration values, accumulating every problem instead of
    /// stopping at the first.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.orchestrator.max_iterations == 0 {
            errors.push("orchestrator.max_iterations must be greater than 0");
        }
        if self
            .orchestrator
            .default_mode
            .parse::<crate::decision::AutonomyMode>()
            .is_err()
        {
            errors.push("orchestrator.default_mode must be assist, builder, or autopilot");
        }

        if self.verification.manifest.is_empty() {
            errors.push("verification.manifest must not be empty");
        }
        if self.verification.timeout_ms == 0 {
            errors.push("verification.timeout_ms must be greater than 0");
        }
        if self.verification.install_cmd.is_empty()
            || self.verification.lint_cmd.is_empty()
            || self.verification.test_cmd.is_empty()
        {
            errors.push("verification commands must not be empty");
        }

        if self.coder.base_url.is_empty() {
            errors.push("coder.base_url must not be empty");
        }
        if !self.planner.gateway_url.starts_with("http://")
            && !self.planner.gateway_url.starts_with("https://")
        {
            errors.push("planner.gateway_url must be an http(s) URL");
        }

        if self.release.timeout_secs == 0 {
            errors.push("release.timeout_secs must be greater than 0");
        }
        if self.release.enabled && self.release.command.is_empty() {
            errors.push("release.command must not be empty when release is enabled");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ForemanError::Config(errors.join("; ")))
        }
    }

    /// Process-wide default credentials. Per-project overrides take
    /// precedence field by field.
    pub fn credentials(&self) -> crate::project::AgentCredentials {
        crate::project::AgentCredentials {
            coder_api_key: self.coder.api_key.clone(),
            planner_token: self.planner.token.clone(),
            github_token: self.git.token.clone(),
        }
    }

    /// Copy safe to display: every secret replaced by a marker.
    pub fn redacted(&self) -> Self {
        let mut shown = self.clone();
        let redact = |v: &mut Option<String>| {
            if v.is_some() {
                *v = Some(String::from("<redacted>"));
            }
        };
        redact(&mut shown.coder.api_key);
        redact(&mut shown.coder.webhook_secret);
        redact(&mut shown.planner.token);
        redact(&mut shown.git.token);
        shown
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse().ok())
}
