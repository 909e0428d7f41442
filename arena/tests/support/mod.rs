//! Fake collaborators shared by the arena integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arena::{
    AcceptedSubmission, AccountDirectory, Announcement, Candidate, CatalogError, ChannelId,
    Difficulty, DuelConfig, DuelManager, Handle, MessagingGateway, OracleError, ParticipantId,
    ProblemCatalog, ProblemCatalogService, SubmissionOracleService,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Account directory backed by a fixed map of participant → handle.
pub struct StaticAccounts(HashMap<String, String>);

impl StaticAccounts {
    pub fn new(links: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self(
            links
                .iter()
                .map(|(p, h)| (p.to_string(), h.to_string()))
                .collect(),
        ))
    }
}

#[async_trait]
impl AccountDirectory for StaticAccounts {
    async fn resolve_handle(&self, participant: &ParticipantId) -> Option<Handle> {
        self.0.get(participant.as_str()).map(|h| Handle::new(h.clone()))
    }
}

/// Gateway that records every announcement, optionally failing delivery.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<(ChannelId, Announcement)>>,
    fail: bool,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    pub fn announcements(&self) -> Vec<Announcement> {
        self.sent.lock().unwrap().iter().map(|(_, a)| a.clone()).collect()
    }

    pub fn last(&self) -> Option<Announcement> {
        self.announcements().pop()
    }

    pub fn count(&self, pred: impl Fn(&Announcement) -> bool) -> usize {
        self.announcements().iter().filter(|a| pred(a)).count()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn announce(
        &self,
        channel: &ChannelId,
        announcement: &Announcement,
    ) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.clone(), announcement.clone()));
        if self.fail {
            anyhow::bail!("gateway offline");
        }
        Ok(())
    }
}

/// Catalog replaying a script; an exhausted script yields empty pages.
pub struct ScriptedCatalog {
    script: Mutex<VecDeque<Candidate>>,
    delay: Option<Duration>,
    calls: Mutex<usize>,
}

impl ScriptedCatalog {
    pub fn new(candidates: Vec<Candidate>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(candidates.into()),
            delay: None,
            calls: Mutex::new(0),
        })
    }

    /// Each fetch suspends for `delay` before answering.
    pub fn slow(candidates: Vec<Candidate>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(candidates.into()),
            delay: Some(delay),
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl ProblemCatalogService for ScriptedCatalog {
    async fn fetch_candidate(
        &self,
        _difficulty: Difficulty,
        _offset: u32,
    ) -> Result<Option<Candidate>, CatalogError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        *self.calls.lock().unwrap() += 1;
        Ok(self.script.lock().unwrap().pop_front())
    }
}

pub fn free(slug: &str, title: &str) -> Candidate {
    Candidate {
        id: slug.into(),
        title: title.into(),
        is_premium: false,
    }
}

pub fn premium(slug: &str) -> Candidate {
    Candidate {
        id: slug.into(),
        title: slug.into(),
        is_premium: true,
    }
}

/// A submission that becomes visible once `visible_after` of (virtual) time
/// has passed since the oracle was created.
struct Scheduled {
    visible_after: Duration,
    submission: AcceptedSubmission,
}

/// Oracle whose answers depend on the paused tokio clock.
pub struct ScriptedOracle {
    created_at: Instant,
    base: DateTime<Utc>,
    schedule: Mutex<HashMap<String, Vec<Scheduled>>>,
    failures: Mutex<HashMap<String, u32>>,
    log: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            created_at: Instant::now(),
            base: Utc::now(),
            schedule: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        })
    }

    /// `handle` solves `slug` with a submission timestamped `base + stamp_secs`,
    /// reported from `visible_after` onwards.
    pub fn solve(&self, handle: &str, slug: &str, stamp_secs: i64, visible_after: Duration) {
        self.schedule
            .lock()
            .unwrap()
            .entry(handle.to_string())
            .or_default()
            .push(Scheduled {
                visible_after,
                submission: AcceptedSubmission {
                    problem: slug.into(),
                    timestamp: self.base + chrono::Duration::seconds(stamp_secs),
                },
            });
    }

    /// The next `count` queries for `handle` fail.
    pub fn fail_next(&self, handle: &str, count: u32) {
        self.failures
            .lock()
            .unwrap()
            .insert(handle.to_string(), count);
    }

    /// Handles in the order they were queried.
    pub fn queries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn queries_for(&self, handle: &str) -> usize {
        self.queries().iter().filter(|h| h.as_str() == handle).count()
    }
}

#[async_trait]
impl SubmissionOracleService for ScriptedOracle {
    async fn recent_accepted_submissions(
        &self,
        handle: &Handle,
        limit: u32,
    ) -> Result<Vec<AcceptedSubmission>, OracleError> {
        self.log.lock().unwrap().push(handle.as_str().to_string());

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(remaining) = failures.get_mut(handle.as_str()) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(OracleError::Request("upstream unavailable".into()));
                }
            }
        }

        let elapsed = self.created_at.elapsed();
        let schedule = self.schedule.lock().unwrap();
        Ok(schedule
            .get(handle.as_str())
            .map(|subs| {
                subs.iter()
                    .filter(|s| s.visible_after <= elapsed)
                    .map(|s| s.submission.clone())
                    .take(limit as usize)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Test configuration: live timing constants, environment ignored.
pub fn config() -> DuelConfig {
    DuelConfig::standard()
}

pub struct Harness {
    pub manager: Arc<DuelManager>,
    pub gateway: Arc<RecordingGateway>,
    pub catalog: Arc<ScriptedCatalog>,
    pub oracle: Arc<ScriptedOracle>,
}

/// U1 → u1-lc and U2 → u2-lc are linked; U3 is not.
pub fn harness(catalog: Arc<ScriptedCatalog>) -> Harness {
    harness_with_gateway(catalog, RecordingGateway::new())
}

pub fn harness_with_gateway(
    catalog: Arc<ScriptedCatalog>,
    gateway: Arc<RecordingGateway>,
) -> Harness {
    let accounts = StaticAccounts::new(&[("U1", "u1-lc"), ("U2", "u2-lc")]);
    let oracle = ScriptedOracle::new();
    let config = config();
    let manager = DuelManager::new(
        accounts,
        catalog.clone(),
        oracle.clone(),
        gateway.clone(),
        config.clone(),
    )
    .with_catalog(ProblemCatalog::new(catalog.clone(), &config).with_seed(42));
    Harness {
        manager: manager.shared(),
        gateway,
        catalog,
        oracle,
    }
}
