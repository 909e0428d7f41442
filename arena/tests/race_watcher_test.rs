//! Race watcher behaviour under a paused clock: tie-breaking, oracle
//! outages, stale submissions and the draw deadline.

mod support;

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arena::{
    ChannelId, Difficulty, Duel, DuelError, DuelOutcome, DuelRegistry, DuelResolver, Handle,
    Participant, ParticipantId, RaceWatcher, SubmissionOracle,
};
use support::{config, free, harness, Harness, RecordingGateway, ScriptedCatalog, ScriptedOracle};

fn chan() -> ChannelId {
    ChannelId::new("c1")
}

fn u(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

async fn start_two_sum(h: &Harness) -> arena::StartedDuel {
    h.manager.request_duel(chan(), u("U1"), u("U2")).await.unwrap();
    h.manager
        .select_difficulty(chan(), u("U1"), Difficulty::Easy)
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn challenger_wins_when_both_appear_on_the_same_tick() {
    let h = harness(ScriptedCatalog::new(vec![free("two-sum", "Two Sum")]));
    // Opponent submitted first, but both become visible between two polls.
    h.oracle.solve("u1-lc", "two-sum", 11, Duration::from_secs(12));
    h.oracle.solve("u2-lc", "two-sum", 6, Duration::from_secs(12));

    let started = start_two_sum(&h).await;
    assert_eq!(started.watcher.await.unwrap(), DuelOutcome::Winner(u("U1")));

    let queries = h.oracle.queries();
    assert_eq!(queries.last().map(String::as_str), Some("u1-lc"));
    assert_eq!(h.oracle.queries_for("u2-lc") + 1, h.oracle.queries_for("u1-lc"));
}

#[tokio::test(start_paused = true)]
async fn draw_polls_both_participants_until_deadline() {
    let h = harness(ScriptedCatalog::new(vec![free("two-sum", "Two Sum")]));
    let began = tokio::time::Instant::now();

    let started = start_two_sum(&h).await;
    assert_eq!(started.watcher.await.unwrap(), DuelOutcome::Draw);

    assert!(began.elapsed() >= config().duel_timeout);
    let polls = h.oracle.queries_for("u1-lc");
    assert!(polls > 0);
    assert_eq!(polls, h.oracle.queries_for("u2-lc"));
    // One tick every poll interval, never more.
    let max_ticks = (config().duel_timeout.as_secs() / config().poll_interval.as_secs()) as usize;
    assert!(polls <= max_ticks);
}

#[tokio::test(start_paused = true)]
async fn oracle_failures_are_retried_on_the_next_tick() {
    let h = harness(ScriptedCatalog::new(vec![free("two-sum", "Two Sum")]));
    h.oracle.fail_next("u1-lc", 3);
    h.oracle.solve("u2-lc", "two-sum", 17, Duration::from_secs(18));

    let started = start_two_sum(&h).await;
    assert_eq!(started.watcher.await.unwrap(), DuelOutcome::Winner(u("U2")));

    let stats = h.manager.oracle_stats().snapshot();
    assert_eq!(stats.failures, 3);
    assert_eq!(stats.solved, 1);
    assert!(stats.queries >= 8);
}

#[tokio::test(start_paused = true)]
async fn submissions_before_start_do_not_count() {
    let h = harness(ScriptedCatalog::new(vec![free("two-sum", "Two Sum")]));
    h.oracle.solve("u1-lc", "two-sum", -600, Duration::ZERO);

    let started = start_two_sum(&h).await;
    assert_eq!(started.watcher.await.unwrap(), DuelOutcome::Draw);
    assert_eq!(h.manager.oracle_stats().snapshot().solved, 0);
}

#[tokio::test(start_paused = true)]
async fn other_problems_do_not_count() {
    let h = harness(ScriptedCatalog::new(vec![free("two-sum", "Two Sum")]));
    h.oracle.solve("u2-lc", "jump-game", 30, Duration::from_secs(30));

    let started = start_two_sum(&h).await;
    assert_eq!(started.watcher.await.unwrap(), DuelOutcome::Draw);
}

#[tokio::test(start_paused = true)]
async fn solve_outside_recent_window_is_missed() {
    let h = harness(ScriptedCatalog::new(vec![free("two-sum", "Two Sum")]));
    // The recent list holds two entries; the qualifying one is third.
    h.oracle.solve("u2-lc", "jump-game", 40, Duration::from_secs(40));
    h.oracle.solve("u2-lc", "climbing-stairs", 41, Duration::from_secs(40));
    h.oracle.solve("u2-lc", "two-sum", 39, Duration::from_secs(40));

    let started = start_two_sum(&h).await;
    assert_eq!(started.watcher.await.unwrap(), DuelOutcome::Draw);
}

#[tokio::test(start_paused = true)]
async fn watcher_requires_an_active_duel() {
    let registry = DuelRegistry::new().shared();
    let resolver = DuelResolver::new(registry, RecordingGateway::new());
    let oracle = Arc::new(SubmissionOracle::new(ScriptedOracle::new(), 2));
    let forming = Duel::new(
        chan(),
        Participant {
            id: u("U1"),
            handle: Handle::new("u1-lc"),
        },
        Participant {
            id: u("U2"),
            handle: Handle::new("u2-lc"),
        },
    );

    let result = RaceWatcher::for_duel(
        &forming,
        tokio::time::Instant::now(),
        oracle,
        resolver,
        &config(),
    );
    assert!(matches!(result, Err(DuelError::InvalidState(_))));
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn one_failing_handle_still_raises_outage_warnings() {
    let logs = LogBuffer::default();
    let sink = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || sink.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let h = harness(ScriptedCatalog::new(vec![free("two-sum", "Two Sum")]));
    h.oracle.fail_next("u1-lc", u32::MAX);

    let started = start_two_sum(&h).await;
    assert_eq!(started.watcher.await.unwrap(), DuelOutcome::Draw);

    // 360 ticks, a warning every 12 failed ticks of the challenger.
    let stats = h.manager.oracle_stats().snapshot();
    assert_eq!(stats.failures, 360);
    assert_eq!(stats.outages, 30);

    let output = logs.contents();
    let warnings: Vec<_> = output
        .lines()
        .filter(|l| l.contains("Sustained oracle outage"))
        .collect();
    assert_eq!(warnings.len(), 30);
    assert!(warnings.iter().all(|l| l.contains("u1-lc")));
    assert!(warnings[0].contains("failed_ticks=12"));
}

#[tokio::test(start_paused = true)]
async fn full_outage_warns_after_threshold_ticks() {
    let h = harness(ScriptedCatalog::new(vec![free("two-sum", "Two Sum")]));
    h.oracle.fail_next("u1-lc", u32::MAX);
    h.oracle.fail_next("u2-lc", u32::MAX);
    let threshold = config().oracle_outage_threshold;
    let interval = config().poll_interval;

    let started = start_two_sum(&h).await;
    // Just short of `threshold` ticks: nothing reported yet.
    tokio::time::sleep(interval * (threshold - 1) - interval / 2).await;
    assert_eq!(h.manager.oracle_stats().snapshot().outages, 0);

    tokio::time::sleep(interval).await;
    assert_eq!(h.manager.oracle_stats().snapshot().outages, 2);

    started.watcher.abort();
}
