//! Duel error taxonomy.
//!
//! Every failure a caller of the lifecycle manager can observe is a
//! [`DuelError`]. Oracle failures never appear here; the race watcher
//! treats them as missed polls and counts them in
//! [`crate::oracle::OracleStats`].
//!
//! | Variant              | Retriable | Slot after failure |
//! |----------------------|-----------|--------------------|
//! | `ChannelBusy`        | yes       | unchanged          |
//! | `NotLinked`          | no        | untouched          |
//! | `Unauthorized`       | no        | still `Forming`    |
//! | `ProblemUnavailable` | yes       | released           |
//! | `InvalidState`       | no        | unchanged          |
//! | `NoDuel`             | no        | empty              |

use thiserror::Error;

use crate::duel::IllegalTransition;
use crate::types::{ChannelId, Difficulty, ParticipantId};

/// Result type alias for lifecycle operations
pub type DuelResult<T> = Result<T, DuelError>;

/// Errors surfaced to duel requesters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuelError {
    /// The channel already hosts a `Forming` or `Active` duel.
    #[error("A duel is already in progress in channel {0}")]
    ChannelBusy(ChannelId),

    /// A participant has no linked judge handle.
    #[error("Participant {0} has not linked a judge handle")]
    NotLinked(ParticipantId),

    /// Someone other than the challenger tried to pick the difficulty.
    #[error("Participant {0} is not the challenger of this duel")]
    Unauthorized(ParticipantId),

    /// The catalog draw was exhausted without a usable problem.
    #[error("No {0} problem could be drawn from the catalog")]
    ProblemUnavailable(Difficulty),

    /// The duel is not in a state that allows the operation.
    #[error("Invalid duel state: {0}")]
    InvalidState(String),

    /// No duel occupies the channel.
    #[error("No duel in channel {0}")]
    NoDuel(ChannelId),
}

impl DuelError {
    /// Whether the requester may simply try the same request again later.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ChannelBusy(_) | Self::ProblemUnavailable(_))
    }

    /// Chat text shown to the requester.
    pub fn user_message(&self) -> String {
        match self {
            Self::ChannelBusy(_) => "❌ A duel is already in progress here.".to_string(),
            Self::NotLinked(who) => format!(
                "❌ {} hasn't linked a LeetCode username. Use `!linkleetcode <username>`.",
                who.mention()
            ),
            Self::Unauthorized(_) => "Only the challenger can pick the difficulty.".to_string(),
            Self::ProblemUnavailable(_) => {
                "Couldn't fetch a problem. Try again later.".to_string()
            }
            Self::InvalidState(reason) => format!("❌ {reason}"),
            Self::NoDuel(_) => "❌ There is no duel waiting in this channel.".to_string(),
        }
    }
}

impl From<IllegalTransition> for DuelError {
    fn from(err: IllegalTransition) -> Self {
        Self::InvalidState(err.to_string())
    }
}
