//! Configuration: per-section serde structs with TOML load/save and
//! environment-variable overrides.

mod settings;

pub use settings::{
    CoderConfig, ForemanConfig, GitConfig, OrchestratorConfig, PlannerConfig, ReleaseConfig,
    VerificationConfig,
};
