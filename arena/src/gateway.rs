//! Messaging Gateway and account directory seams.
//!
//! The duel core only talks to the chat platform through [`MessagingGateway`]
//! and to the account-linking store through [`AccountDirectory`]. Delivery
//! failures are logged and otherwise ignored; no duel state depends on a
//! message arriving.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::DuelError;
use crate::types::{ChannelId, Difficulty, Handle, ParticipantId, Problem};

/// Resolves chat participants to judge handles.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `None` when the participant has not linked an account.
    async fn resolve_handle(&self, participant: &ParticipantId) -> Option<Handle>;
}

/// Side-effect messages emitted into a duel's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Announcement {
    /// A duel was reserved and the challenger must pick a difficulty.
    Challenge {
        challenger: ParticipantId,
        opponent: ParticipantId,
    },
    /// The challenger did not pick a difficulty in time; the slot is free.
    SelectionExpired { challenger: ParticipantId },
    /// The catalog draw started.
    DrawingProblem { difficulty: Difficulty },
    /// The clock is running.
    DuelStarted { problem: Problem, timeout: Duration },
    Winner { participant: ParticipantId },
    Draw,
    /// A request failed; addressed to the requester.
    Rejected { error: DuelError },
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Challenge {
                challenger,
                opponent,
            } => write!(
                f,
                "⚔️ {} vs {}! {} pick a difficulty: easy, medium or hard.",
                challenger.mention(),
                opponent.mention(),
                challenger.mention()
            ),
            Self::SelectionExpired { challenger } => write!(
                f,
                "⌛ {} didn't pick a difficulty in time. Duel cancelled.",
                challenger.mention()
            ),
            Self::DrawingProblem { difficulty } => {
                write!(f, "Fetching a {difficulty} problem...")
            }
            Self::DuelStarted { problem, timeout } => write!(
                f,
                "🤺 **{}**\n{} minutes, GO!",
                problem.title,
                timeout.as_secs() / 60
            ),
            Self::Winner { participant } => write!(f, "🏆 {} wins!", participant.mention()),
            Self::Draw => write!(f, "⏰ Draw! No solutions submitted."),
            Self::Rejected { error } => write!(f, "{}", error.user_message()),
        }
    }
}

/// Outbound chat messages.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn announce(&self, channel: &ChannelId, announcement: &Announcement)
        -> anyhow::Result<()>;
}

/// Send an announcement, logging instead of failing when delivery breaks.
pub(crate) async fn deliver(
    gateway: &dyn MessagingGateway,
    channel: &ChannelId,
    announcement: Announcement,
) {
    if let Err(e) = gateway.announce(channel, &announcement).await {
        warn!(%channel, error = %e, "Announcement delivery failed");
    }
}
