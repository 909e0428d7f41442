//! Duel Lifecycle Manager: creation, problem draw, and resolution.
//!
//! ```text
//! request_duel ──▶ Forming ──select_difficulty──▶ Active ──watcher──▶ Resolved
//!       │                  │      │                                     │
//!   ChannelBusy            │  ProblemUnavailable                     release
//!   NotLinked              │  (slot released)
//!                   selection_timeout
//!                   (slot released)
//! ```
//!
//! Every failed request is reported to the channel through the messaging
//! gateway and returned to the caller. Resolution is idempotent: only the
//! first `resolve` for a given duel runs the transition and the announcement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::{ProblemCatalog, ProblemCatalogService};
use crate::config::DuelConfig;
use crate::duel::{Duel, DuelOutcome, DuelStatus, Participant};
use crate::error::{DuelError, DuelResult};
use crate::gateway::{deliver, AccountDirectory, Announcement, MessagingGateway};
use crate::oracle::{OracleStats, SubmissionOracle, SubmissionOracleService};
use crate::registry::{DuelRegistry, SharedDuelRegistry};
use crate::types::{ChannelId, Difficulty, DuelId, ParticipantId, Problem};
use crate::watcher::RaceWatcher;

/// Shared reference to DuelManager
pub type SharedDuelManager = Arc<DuelManager>;

/// A duel whose clock is running.
#[derive(Debug)]
pub struct StartedDuel {
    pub duel_id: DuelId,
    pub problem: Problem,
    pub start_time: DateTime<Utc>,
    /// The race watcher task; resolves with the duel outcome.
    pub watcher: JoinHandle<DuelOutcome>,
}

/// Terminates duels: `Active → Resolved`, announce, release the slot.
#[derive(Clone)]
pub struct DuelResolver {
    registry: SharedDuelRegistry,
    gateway: Arc<dyn MessagingGateway>,
}

impl DuelResolver {
    pub fn new(registry: SharedDuelRegistry, gateway: Arc<dyn MessagingGateway>) -> Self {
        Self { registry, gateway }
    }

    /// Resolve duel `duel_id` in `channel`.
    ///
    /// Returns `false` without side effects when the duel is gone, was
    /// replaced, or has already been resolved.
    pub async fn resolve(&self, channel: &ChannelId, duel_id: DuelId, outcome: DuelOutcome) -> bool {
        let announcement = match &outcome {
            DuelOutcome::Winner(participant) => Announcement::Winner {
                participant: participant.clone(),
            },
            DuelOutcome::Draw => Announcement::Draw,
            DuelOutcome::Unresolved => {
                warn!(%channel, %duel_id, "Refusing to resolve a duel as unresolved");
                return false;
            }
        };

        let transitioned = self
            .registry
            .update(channel, |duel| {
                duel.id() == duel_id && duel.resolve(outcome.clone()).is_ok()
            })
            .unwrap_or(false);
        if !transitioned {
            debug!(%channel, %duel_id, "Ignoring resolution for a duel that is no longer active");
            return false;
        }

        deliver(self.gateway.as_ref(), channel, announcement).await;
        self.registry.release_if(channel, duel_id);
        info!(%channel, %duel_id, outcome = ?outcome, "Duel resolved");
        true
    }
}

/// Orchestrates duel creation and termination.
pub struct DuelManager {
    registry: SharedDuelRegistry,
    accounts: Arc<dyn AccountDirectory>,
    catalog: ProblemCatalog,
    oracle: Arc<SubmissionOracle>,
    gateway: Arc<dyn MessagingGateway>,
    resolver: DuelResolver,
    config: DuelConfig,
}

impl DuelManager {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        catalog: Arc<dyn ProblemCatalogService>,
        oracle: Arc<dyn SubmissionOracleService>,
        gateway: Arc<dyn MessagingGateway>,
        config: DuelConfig,
    ) -> Self {
        let registry = DuelRegistry::new().shared();
        Self {
            resolver: DuelResolver::new(registry.clone(), gateway.clone()),
            catalog: ProblemCatalog::new(catalog, &config),
            oracle: Arc::new(SubmissionOracle::new(oracle, config.recent_submission_limit)),
            registry,
            accounts,
            gateway,
            config,
        }
    }

    /// Replace the catalog draw (e.g. with a seeded one).
    pub fn with_catalog(mut self, catalog: ProblemCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Create a shared reference to this manager
    pub fn shared(self) -> SharedDuelManager {
        Arc::new(self)
    }

    pub fn registry(&self) -> SharedDuelRegistry {
        self.registry.clone()
    }

    pub fn oracle_stats(&self) -> Arc<OracleStats> {
        self.oracle.stats()
    }

    /// Copy of the duel currently occupying `channel`.
    pub fn duel(&self, channel: &ChannelId) -> Option<Duel> {
        self.registry.snapshot(channel)
    }

    // =========================================================================
    // Creation
    // =========================================================================

    /// Reserve `channel` for a duel between `challenger` and `opponent`.
    ///
    /// On success the duel is `Forming` and waits for the challenger to pick
    /// a difficulty.
    pub async fn request_duel(
        &self,
        channel: ChannelId,
        challenger: ParticipantId,
        opponent: ParticipantId,
    ) -> DuelResult<DuelId> {
        let result = self.reserve(&channel, &challenger, &opponent).await;
        match &result {
            Ok(duel_id) => {
                info!(%channel, %duel_id, %challenger, %opponent, "Duel requested");
                self.spawn_selection_expiry(channel.clone(), *duel_id, challenger.clone());
                deliver(
                    self.gateway.as_ref(),
                    &channel,
                    Announcement::Challenge {
                        challenger,
                        opponent,
                    },
                )
                .await;
            }
            Err(e) => self.reject(&channel, e).await,
        }
        result
    }

    async fn reserve(
        &self,
        channel: &ChannelId,
        challenger: &ParticipantId,
        opponent: &ParticipantId,
    ) -> DuelResult<DuelId> {
        if self.registry.is_occupied(channel) {
            return Err(DuelError::ChannelBusy(channel.clone()));
        }
        if challenger == opponent {
            return Err(DuelError::InvalidState(
                "you can't challenge yourself".to_string(),
            ));
        }

        let challenger = self.linked(challenger).await?;
        let opponent = self.linked(opponent).await?;

        let duel = Duel::new(channel.clone(), challenger, opponent);
        let duel_id = duel.id();
        if !self.registry.try_occupy(duel) {
            return Err(DuelError::ChannelBusy(channel.clone()));
        }
        Ok(duel_id)
    }

    /// Free the slot if the duel is still waiting for a difficulty once
    /// `selection_timeout` has passed. A draw in flight keeps the slot.
    fn spawn_selection_expiry(&self, channel: ChannelId, duel_id: DuelId, challenger: ParticipantId) {
        let registry = self.registry.clone();
        let gateway = self.gateway.clone();
        let timeout = self.config.selection_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let expired = registry.release_where(&channel, |duel| {
                duel.id() == duel_id
                    && duel.status() == DuelStatus::Forming
                    && !duel.is_drawing()
            });
            if expired.is_some() {
                info!(%channel, %duel_id, "Difficulty not chosen in time, slot released");
                deliver(
                    gateway.as_ref(),
                    &channel,
                    Announcement::SelectionExpired { challenger },
                )
                .await;
            }
        });
    }

    async fn linked(&self, participant: &ParticipantId) -> DuelResult<Participant> {
        self.accounts
            .resolve_handle(participant)
            .await
            .map(|handle| Participant {
                id: participant.clone(),
                handle,
            })
            .ok_or_else(|| DuelError::NotLinked(participant.clone()))
    }

    // =========================================================================
    // Difficulty selection
    // =========================================================================

    /// Pick the difficulty for the `Forming` duel in `channel` and start it.
    ///
    /// Only the challenger may call this. If no problem can be drawn the
    /// slot is released so the duel can be requested again immediately.
    pub async fn select_difficulty(
        &self,
        channel: ChannelId,
        requester: ParticipantId,
        difficulty: Difficulty,
    ) -> DuelResult<StartedDuel> {
        let result = self.start(&channel, &requester, difficulty).await;
        if let Err(e) = &result {
            self.reject(&channel, e).await;
        }
        result
    }

    async fn start(
        &self,
        channel: &ChannelId,
        requester: &ParticipantId,
        difficulty: Difficulty,
    ) -> DuelResult<StartedDuel> {
        let duel_id = self
            .registry
            .update(channel, |duel| -> DuelResult<DuelId> {
                if &duel.challenger().id != requester {
                    return Err(DuelError::Unauthorized(requester.clone()));
                }
                if duel.status() != DuelStatus::Forming {
                    return Err(DuelError::InvalidState(format!(
                        "the duel is already {}",
                        duel.status()
                    )));
                }
                if duel.is_drawing() {
                    return Err(DuelError::InvalidState(
                        "a problem is already being drawn".to_string(),
                    ));
                }
                duel.begin_draw()?;
                Ok(duel.id())
            })
            .ok_or_else(|| DuelError::NoDuel(channel.clone()))??;

        deliver(
            self.gateway.as_ref(),
            channel,
            Announcement::DrawingProblem { difficulty },
        )
        .await;

        let Some(problem) = self.catalog.draw(difficulty).await else {
            self.registry.release_if(channel, duel_id);
            info!(%channel, %duel_id, %difficulty, "Problem draw exhausted, slot released");
            return Err(DuelError::ProblemUnavailable(difficulty));
        };

        let start_time = Utc::now();
        let deadline = Instant::now() + self.config.duel_timeout;
        let duel = self
            .registry
            .update(channel, |duel| -> DuelResult<Duel> {
                if duel.id() != duel_id {
                    return Err(DuelError::InvalidState(
                        "the duel was replaced during the draw".to_string(),
                    ));
                }
                duel.activate(problem.clone(), start_time, self.config.duel_timeout)?;
                Ok(duel.clone())
            })
            .ok_or_else(|| DuelError::NoDuel(channel.clone()))??;

        let watcher = RaceWatcher::for_duel(
            &duel,
            deadline,
            self.oracle.clone(),
            self.resolver.clone(),
            &self.config,
        )?;

        info!(
            %channel,
            %duel_id,
            problem = %problem.id,
            %start_time,
            "Duel started"
        );
        deliver(
            self.gateway.as_ref(),
            channel,
            Announcement::DuelStarted {
                problem: problem.clone(),
                timeout: self.config.duel_timeout,
            },
        )
        .await;

        Ok(StartedDuel {
            duel_id,
            problem,
            start_time,
            watcher: tokio::spawn(watcher.run()),
        })
    }

    // =========================================================================
    // Termination
    // =========================================================================

    /// Resolve the duel in `channel`; see [`DuelResolver::resolve`].
    pub async fn resolve(&self, channel: &ChannelId, duel_id: DuelId, outcome: DuelOutcome) -> bool {
        self.resolver.resolve(channel, duel_id, outcome).await
    }

    async fn reject(&self, channel: &ChannelId, error: &DuelError) {
        debug!(
            %channel,
            error = %error,
            retriable = error.is_retriable(),
            "Duel request rejected"
        );
        deliver(
            self.gateway.as_ref(),
            channel,
            Announcement::Rejected {
                error: error.clone(),
            },
        )
        .await;
    }
}
