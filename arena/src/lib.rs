//! Head-to-head coding duels
//!
//! This library provides:
//! - A per-channel duel registry enforcing one live duel per channel
//! - A lifecycle manager driving `Forming → Active → Resolved`
//! - A race watcher polling a submission oracle for both participants
//! - A bounded random draw of non-premium problems from a catalog
//!
//! The chat platform, the account store, the problem catalog and the
//! submission oracle are reached through the traits in [`gateway`],
//! [`catalog`] and [`oracle`]; concrete clients live in the `duel-bot` crate.
//!
//! # Usage
//!
//! ```rust,ignore
//! let manager = DuelManager::new(accounts, catalog, oracle, gateway, DuelConfig::default());
//! manager.request_duel("chan".into(), "alice".into(), "bob".into()).await?;
//! let started = manager
//!     .select_difficulty("chan".into(), "alice".into(), Difficulty::Easy)
//!     .await?;
//! let outcome = started.watcher.await?;
//! ```

pub mod catalog;
pub mod config;
pub mod duel;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod oracle;
pub mod registry;
pub mod types;
pub mod watcher;

pub use catalog::{Candidate, CatalogError, ProblemCatalog, ProblemCatalogService};
pub use config::DuelConfig;
pub use duel::{Duel, DuelOutcome, DuelStatus, IllegalTransition, Participant};
pub use error::{DuelError, DuelResult};
pub use gateway::{AccountDirectory, Announcement, MessagingGateway};
pub use lifecycle::{DuelManager, DuelResolver, SharedDuelManager, StartedDuel};
pub use oracle::{
    AcceptedSubmission, OracleError, OracleStats, OracleStatsSnapshot, SubmissionOracle,
    SubmissionOracleService,
};
pub use registry::{DuelRegistry, SharedDuelRegistry};
pub use types::{ChannelId, Difficulty, DuelId, Handle, ParticipantId, Problem, ProblemId};
pub use watcher::RaceWatcher;
