//! Submission Oracle Client: "has this handle solved this problem since T?"
//!
//! The backing service only lists a handle's most recent accepted
//! submissions; the client scans that list for the duel's problem with a
//! timestamp at or after the duel start.
//!
//! Failures are returned to the caller, which treats them as "not solved this
//! tick". Every query and failure is counted in [`OracleStats`] so sustained
//! outages stay visible.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Handle, ProblemId};

/// Error type for oracle service calls
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("Oracle request failed: {0}")]
    Request(String),

    #[error("Malformed oracle response: {0}")]
    Response(String),
}

/// An accepted submission reported by the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedSubmission {
    pub problem: ProblemId,
    pub timestamp: DateTime<Utc>,
}

/// Backing submission oracle.
#[async_trait]
pub trait SubmissionOracleService: Send + Sync {
    /// Most recent accepted submissions of `handle`, newest first, at most `limit`.
    async fn recent_accepted_submissions(
        &self,
        handle: &Handle,
        limit: u32,
    ) -> Result<Vec<AcceptedSubmission>, OracleError>;
}

/// Oracle query counters shared by every watcher.
#[derive(Debug, Default)]
pub struct OracleStats {
    queries: AtomicU64,
    solved: AtomicU64,
    failures: AtomicU64,
    outages: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleStatsSnapshot {
    pub queries: u64,
    pub solved: u64,
    pub failures: u64,
    /// Outage warnings raised by watchers.
    pub outages: u64,
}

impl OracleStats {
    fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_solved(&self) {
        self.solved.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outage(&self) {
        self.outages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> OracleStatsSnapshot {
        OracleStatsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            solved: self.solved.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            outages: self.outages.load(Ordering::Relaxed),
        }
    }
}

/// Answers "solved since" questions on top of a [`SubmissionOracleService`].
pub struct SubmissionOracle {
    service: Arc<dyn SubmissionOracleService>,
    limit: u32,
    stats: Arc<OracleStats>,
}

impl SubmissionOracle {
    pub fn new(service: Arc<dyn SubmissionOracleService>, limit: u32) -> Self {
        Self {
            service,
            limit,
            stats: Arc::new(OracleStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<OracleStats> {
        self.stats.clone()
    }

    /// Whether `handle` has an accepted submission of `problem` at or after `since`.
    pub async fn has_solved(
        &self,
        handle: &Handle,
        problem: &ProblemId,
        since: DateTime<Utc>,
    ) -> Result<bool, OracleError> {
        self.stats.record_query();
        let submissions = match self
            .service
            .recent_accepted_submissions(handle, self.limit)
            .await
        {
            Ok(subs) => subs,
            Err(e) => {
                self.stats.record_failure();
                return Err(e);
            }
        };

        let solved = submissions
            .iter()
            .any(|sub| &sub.problem == problem && sub.timestamp >= since);
        if solved {
            self.stats.record_solved();
            debug!(%handle, %problem, "Qualifying submission found");
        }
        Ok(solved)
    }
}
