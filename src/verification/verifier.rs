use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::project::{RepoRef, VerificationResult};

use super::engine::VerificationEngine;
use super::repo::clone_or_update;

/// Repository acquisition plus the command pipeline, behind one seam.
///
/// The completion handler only needs "give me a verdict for this repo at
/// this branch"; splitting acquisition from the pipeline here keeps git out
/// of its tests.
#[async_trait]
pub trait ProjectVerifier: Send + Sync {
    /// Materializes the repository at `branch` into `checkout` and runs the
    /// verification pipeline there. `Err` means the repo could not be
    /// acquired at all; a pipeline failure is a normal `Ok` result with
    /// `success = false`.
    async fn acquire_and_verify(
        &self,
        repo: &RepoRef,
        branch: &str,
        checkout: &Path,
        token: Option<&str>,
    ) -> Result<VerificationResult>;
}

pub struct GitProjectVerifier {
    engine: VerificationEngine,
}

impl GitProjectVerifier {
    pub fn new(engine: VerificationEngine) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl ProjectVerifier for GitProjectVerifier {
    async fn acquire_and_verify(
        &self,
        repo: &RepoRef,
        branch: &str,
        checkout: &Path,
        token: Option<&str>,
    ) -> Result<VerificationResult> {
        clone_or_update(&repo.repository, branch, checkout, token).await?;
        Ok(self.engine.verify(checkout).await)
    }
}
