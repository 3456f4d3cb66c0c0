pub mod agents;
pub mod config;
pub mod decision;
pub mod error;
pub mod orchestrator;
pub mod outcome;
pub mod persistence;
pub mod project;
pub mod recovery;
pub mod release;
pub mod verification;

pub use agents::{CoderClient, HttpCoderClient, HttpPlannerClient, PlannerClient};
pub use config::ForemanConfig;
pub use decision::{AutonomyMode, DecisionEngine};
pub use error::{ForemanError, Result};
pub use orchestrator::{SignalOutcome, StartRequest, WebhookBridge};
pub use persistence::{JsonFileStore, MemoryStore, ProjectStore};
pub use project::{ProjectRegistry, ProjectState, ProjectStatus, Task};
pub use release::{EasReleaseRunner, NoopReleaseRunner, ReleaseRunner};
pub use verification::{GitProjectVerifier, ProjectVerifier, VerificationEngine};
