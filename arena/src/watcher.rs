//! Race Watcher: one polling task per active duel.
//!
//! Each tick queries the oracle for the challenger, then the opponent, and
//! stops at the first participant reported as solved. The opponent is not
//! queried on a tick where the challenger is found, so when both solve
//! between two polls the challenger is credited regardless of which
//! submission came first. Ticks are separated by `poll_interval` measured
//! from the end of the previous tick's work.
//!
//! The loop exits on a winner or once the deadline passes, then hands the
//! outcome to the [`DuelResolver`]. Oracle failures count as "not solved
//! this tick"; the next tick is the retry. Failed ticks are tracked per
//! participant so one broken handle is reported even while the other is
//! healthy.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::DuelConfig;
use crate::duel::{Duel, DuelOutcome, DuelStatus, Participant};
use crate::error::{DuelError, DuelResult};
use crate::lifecycle::DuelResolver;
use crate::oracle::SubmissionOracle;
use crate::types::{ChannelId, DuelId, ParticipantId, ProblemId};

/// Polls the oracle for both participants of one duel.
pub struct RaceWatcher {
    duel_id: DuelId,
    channel: ChannelId,
    participants: [Participant; 2],
    problem: ProblemId,
    start_time: DateTime<Utc>,
    deadline: Instant,
    poll_interval: Duration,
    outage_threshold: u32,
    oracle: Arc<SubmissionOracle>,
    resolver: DuelResolver,
}

impl RaceWatcher {
    /// Build a watcher for an `Active` duel whose clock expires at `deadline`.
    pub fn for_duel(
        duel: &Duel,
        deadline: Instant,
        oracle: Arc<SubmissionOracle>,
        resolver: DuelResolver,
        config: &DuelConfig,
    ) -> DuelResult<Self> {
        let (Some(problem), Some(start_time)) = (duel.problem(), duel.start_time()) else {
            return Err(DuelError::InvalidState(format!(
                "duel {} has no problem or start time",
                duel.id()
            )));
        };
        if duel.status() != DuelStatus::Active {
            return Err(DuelError::InvalidState(format!(
                "cannot watch a {} duel",
                duel.status()
            )));
        }

        let [challenger, opponent] = duel.participants();
        Ok(Self {
            duel_id: duel.id(),
            channel: duel.channel().clone(),
            participants: [challenger.clone(), opponent.clone()],
            problem: problem.id.clone(),
            start_time,
            deadline,
            poll_interval: config.poll_interval,
            outage_threshold: config.oracle_outage_threshold,
            oracle,
            resolver,
        })
    }

    /// Race to a winner or the deadline, then resolve the duel.
    pub async fn run(self) -> DuelOutcome {
        info!(
            channel = %self.channel,
            duel_id = %self.duel_id,
            problem = %self.problem,
            "Race watcher started"
        );
        let outcome = self.race().await;
        self.resolver
            .resolve(&self.channel, self.duel_id, outcome.clone())
            .await;
        outcome
    }

    /// Poll until a winner is found or the deadline passes.
    pub async fn race(&self) -> DuelOutcome {
        let mut failed_ticks = [0u32; 2];
        let mut tick = 0u64;

        while Instant::now() < self.deadline {
            tick += 1;
            if let Some(winner) = self.poll_tick(&mut failed_ticks).await {
                info!(
                    channel = %self.channel,
                    duel_id = %self.duel_id,
                    winner = %winner,
                    tick,
                    "Winner detected"
                );
                return DuelOutcome::Winner(winner);
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        info!(
            channel = %self.channel,
            duel_id = %self.duel_id,
            ticks = tick,
            "Deadline reached without a solve"
        );
        DuelOutcome::Draw
    }

    /// One query per participant, challenger first. `failed_ticks` holds each
    /// participant's current run of failed queries.
    async fn poll_tick(&self, failed_ticks: &mut [u32; 2]) -> Option<ParticipantId> {
        for (participant, streak) in self.participants.iter().zip(failed_ticks.iter_mut()) {
            match self
                .oracle
                .has_solved(&participant.handle, &self.problem, self.start_time)
                .await
            {
                Ok(true) => return Some(participant.id.clone()),
                Ok(false) => *streak = 0,
                Err(e) => {
                    *streak += 1;
                    debug!(
                        duel_id = %self.duel_id,
                        handle = %participant.handle,
                        error = %e,
                        "Oracle query failed, treating as unsolved"
                    );
                    if self.outage_threshold > 0 && *streak % self.outage_threshold == 0 {
                        self.oracle.stats().record_outage();
                        warn!(
                            channel = %self.channel,
                            duel_id = %self.duel_id,
                            handle = %participant.handle,
                            failed_ticks = *streak,
                            "Sustained oracle outage; solves may be detected late"
                        );
                    }
                }
            }
        }
        None
    }
}
