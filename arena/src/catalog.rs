//! Problem Catalog Client: bounded random draw of a non-premium problem.
//!
//! Each attempt picks a random offset into the problem set for the chosen
//! difficulty and fetches one candidate. Premium-only candidates, empty
//! pages and failed fetches all consume an attempt; after
//! `draw_attempts` the draw gives up and reports nothing found.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::DuelConfig;
use crate::types::{Difficulty, Problem, ProblemId};

/// Error type for catalog service calls
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog request failed: {0}")]
    Request(String),

    #[error("Malformed catalog response: {0}")]
    Response(String),
}

/// One problem returned by the catalog service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: ProblemId,
    pub title: String,
    pub is_premium: bool,
}

impl From<Candidate> for Problem {
    fn from(candidate: Candidate) -> Self {
        Problem {
            id: candidate.id,
            title: candidate.title,
        }
    }
}

/// Backing problem catalog.
#[async_trait]
pub trait ProblemCatalogService: Send + Sync {
    /// Fetch the candidate at `offset` in the problem set for `difficulty`.
    ///
    /// `Ok(None)` means the page at that offset was empty.
    async fn fetch_candidate(
        &self,
        difficulty: Difficulty,
        offset: u32,
    ) -> Result<Option<Candidate>, CatalogError>;
}

/// Draws random non-premium problems from a [`ProblemCatalogService`].
pub struct ProblemCatalog {
    service: Arc<dyn ProblemCatalogService>,
    attempts: u32,
    max_offset: u32,
    rng: Mutex<StdRng>,
}

impl ProblemCatalog {
    pub fn new(service: Arc<dyn ProblemCatalogService>, config: &DuelConfig) -> Self {
        Self {
            service,
            attempts: config.draw_attempts,
            max_offset: config.max_offset,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Use a deterministic offset sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    fn next_offset(&self) -> u32 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(0..=self.max_offset)
    }

    /// Draw a non-premium problem, or `None` once the attempt bound is spent.
    pub async fn draw(&self, difficulty: Difficulty) -> Option<Problem> {
        for attempt in 1..=self.attempts {
            let offset = self.next_offset();
            match self.service.fetch_candidate(difficulty, offset).await {
                Ok(Some(candidate)) if candidate.is_premium => {
                    debug!(
                        attempt,
                        offset,
                        problem = %candidate.id,
                        "Skipping premium-only candidate"
                    );
                }
                Ok(Some(candidate)) => {
                    info!(
                        attempt,
                        %difficulty,
                        problem = %candidate.id,
                        "Drew duel problem"
                    );
                    return Some(candidate.into());
                }
                Ok(None) => {
                    debug!(attempt, offset, %difficulty, "Empty catalog page, retrying");
                }
                Err(e) => {
                    warn!(attempt, offset, %difficulty, error = %e, "Catalog fetch failed");
                }
            }
        }

        warn!(
            attempts = self.attempts,
            %difficulty,
            "No usable problem found within draw bound"
        );
        None
    }
}
