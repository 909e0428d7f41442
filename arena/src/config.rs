//! Duel timing and search bounds.
//!
//! Defaults reproduce the live bot: 5 s between polls, 30 minute duels,
//! 10 catalog draws. Each value can be overridden from the environment.

use std::time::Duration;

/// Environment overrides.
const ENV_POLL_INTERVAL_SECS: &str = "DUEL_POLL_INTERVAL_SECS";
const ENV_TIMEOUT_SECS: &str = "DUEL_TIMEOUT_SECS";
const ENV_SELECTION_TIMEOUT_SECS: &str = "DUEL_SELECTION_TIMEOUT_SECS";
const ENV_DRAW_ATTEMPTS: &str = "DUEL_DRAW_ATTEMPTS";
const ENV_MAX_OFFSET: &str = "DUEL_MAX_OFFSET";
const ENV_RECENT_LIMIT: &str = "DUEL_RECENT_LIMIT";
const ENV_OUTAGE_THRESHOLD: &str = "DUEL_OUTAGE_THRESHOLD";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_DUEL_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_SELECTION_TIMEOUT: Duration = Duration::from_secs(180);
pub const DEFAULT_DRAW_ATTEMPTS: u32 = 10;
pub const DEFAULT_MAX_OFFSET: u32 = 500;
pub const DEFAULT_RECENT_LIMIT: u32 = 2;
/// One minute of failed ticks at the default interval.
pub const DEFAULT_OUTAGE_THRESHOLD: u32 = 12;

/// Configuration shared by the lifecycle manager, catalog and watchers.
#[derive(Debug, Clone)]
pub struct DuelConfig {
    /// Delay between the end of one watcher tick and the start of the next.
    pub poll_interval: Duration,
    /// Length of a duel measured from its start time.
    pub duel_timeout: Duration,
    /// How long a `Forming` duel waits for a difficulty before its slot is freed.
    pub selection_timeout: Duration,
    /// Maximum catalog candidates inspected per difficulty selection.
    pub draw_attempts: u32,
    /// Inclusive upper bound of the random offset into the problem set.
    pub max_offset: u32,
    /// How many recent accepted submissions to fetch per oracle query.
    pub recent_submission_limit: u32,
    /// Consecutive failed ticks for one participant before a watcher
    /// reports an outage, and again at every further multiple.
    pub oracle_outage_threshold: u32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            poll_interval: env_secs(ENV_POLL_INTERVAL_SECS).unwrap_or(DEFAULT_POLL_INTERVAL),
            duel_timeout: env_secs(ENV_TIMEOUT_SECS).unwrap_or(DEFAULT_DUEL_TIMEOUT),
            selection_timeout: env_secs(ENV_SELECTION_TIMEOUT_SECS)
                .unwrap_or(DEFAULT_SELECTION_TIMEOUT),
            draw_attempts: env_u32(ENV_DRAW_ATTEMPTS).unwrap_or(DEFAULT_DRAW_ATTEMPTS),
            max_offset: env_u32(ENV_MAX_OFFSET).unwrap_or(DEFAULT_MAX_OFFSET),
            recent_submission_limit: env_u32(ENV_RECENT_LIMIT).unwrap_or(DEFAULT_RECENT_LIMIT),
            oracle_outage_threshold: env_u32(ENV_OUTAGE_THRESHOLD)
                .unwrap_or(DEFAULT_OUTAGE_THRESHOLD),
        }
    }
}

impl DuelConfig {
    /// Built-in constants, ignoring the environment.
    pub fn standard() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            duel_timeout: DEFAULT_DUEL_TIMEOUT,
            selection_timeout: DEFAULT_SELECTION_TIMEOUT,
            draw_attempts: DEFAULT_DRAW_ATTEMPTS,
            max_offset: DEFAULT_MAX_OFFSET,
            recent_submission_limit: DEFAULT_RECENT_LIMIT,
            oracle_outage_threshold: DEFAULT_OUTAGE_THRESHOLD,
        }
    }
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
}
