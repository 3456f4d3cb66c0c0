//! Subprocess-backed project verification.
//!
//! Acquires the project repository, runs the configured install, lint,
//! test, and doctor commands under hard timeouts, and distills failing
//! output into the error lines the rest of the system reasons about.

mod engine;
mod errors;
mod repo;
mod runner;
mod verifier;

pub use engine::VerificationEngine;
pub use errors::extract_errors;
pub use repo::clone_or_update;
pub use runner::{run_command, run_program, CommandOutput};
pub use verifier::{GitProjectVerifier, ProjectVerifier};
