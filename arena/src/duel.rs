//! Duel record and its status state machine.
//!
//! A duel moves strictly `Forming → Active → Resolved`. The problem and the
//! start time are written exactly once, by the `Forming → Active` edge, and
//! the fields are private so nothing else can rewrite them.
//!
//! ```text
//! Forming ──activate──▶ Active ──resolve──▶ Resolved
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ChannelId, DuelId, Handle, ParticipantId, Problem};

/// Lifecycle status of a duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    /// Reserved, waiting for the challenger to choose a difficulty.
    Forming,
    /// Clock running, race watcher polling.
    Active,
    /// Winner or draw recorded. Terminal.
    Resolved,
}

impl DuelStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved)
    }
}

impl fmt::Display for DuelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forming => write!(f, "Forming"),
            Self::Active => write!(f, "Active"),
            Self::Resolved => write!(f, "Resolved"),
        }
    }
}

fn is_legal_transition(from: DuelStatus, to: DuelStatus) -> bool {
    use DuelStatus::*;

    matches!((from, to), (Forming, Active) | (Active, Resolved))
}

/// Error returned when an illegal status transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: DuelStatus,
    pub to: DuelStatus,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal duel transition: {} → {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Result of a duel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelOutcome {
    Unresolved,
    Winner(ParticipantId),
    Draw,
}

/// A participant together with the judge handle resolved at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub handle: Handle,
}

/// One head-to-head duel occupying a channel slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Duel {
    id: DuelId,
    channel: ChannelId,
    challenger: Participant,
    opponent: Participant,
    status: DuelStatus,
    outcome: DuelOutcome,
    problem: Option<Problem>,
    start_time: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    /// Set while a catalog draw is in flight for this `Forming` duel.
    drawing: bool,
}

impl Duel {
    /// Create a `Forming` duel.
    pub fn new(channel: ChannelId, challenger: Participant, opponent: Participant) -> Self {
        Self {
            id: DuelId::new(),
            channel,
            challenger,
            opponent,
            status: DuelStatus::Forming,
            outcome: DuelOutcome::Unresolved,
            problem: None,
            start_time: None,
            deadline: None,
            drawing: false,
        }
    }

    pub fn id(&self) -> DuelId {
        self.id
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn challenger(&self) -> &Participant {
        &self.challenger
    }

    pub fn opponent(&self) -> &Participant {
        &self.opponent
    }

    /// Participants in polling order: challenger first.
    pub fn participants(&self) -> [&Participant; 2] {
        [&self.challenger, &self.opponent]
    }

    pub fn status(&self) -> DuelStatus {
        self.status
    }

    pub fn outcome(&self) -> &DuelOutcome {
        &self.outcome
    }

    pub fn problem(&self) -> Option<&Problem> {
        self.problem.as_ref()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    /// Mark a catalog draw as in flight. Only one draw may run at a time.
    pub fn begin_draw(&mut self) -> Result<(), IllegalTransition> {
        if self.status != DuelStatus::Forming || self.drawing {
            return Err(IllegalTransition {
                from: self.status,
                to: DuelStatus::Active,
            });
        }
        self.drawing = true;
        Ok(())
    }

    /// `Forming → Active`: fix the problem and stamp the clock.
    pub fn activate(
        &mut self,
        problem: Problem,
        start_time: DateTime<Utc>,
        timeout: Duration,
    ) -> Result<(), IllegalTransition> {
        self.advance(DuelStatus::Active)?;
        self.problem = Some(problem);
        self.start_time = Some(start_time);
        self.deadline = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|timeout| start_time.checked_add_signed(timeout));
        self.drawing = false;
        Ok(())
    }

    /// `Active → Resolved`: record the outcome.
    pub fn resolve(&mut self, outcome: DuelOutcome) -> Result<(), IllegalTransition> {
        self.advance(DuelStatus::Resolved)?;
        self.outcome = outcome;
        Ok(())
    }

    fn advance(&mut self, to: DuelStatus) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.status, to) {
            return Err(IllegalTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
