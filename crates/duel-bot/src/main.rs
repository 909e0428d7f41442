//! Console front end for LeetCode duels.
//!
//! Reads `<channel> <author> !command [arg]` lines from stdin and prints
//! announcements to stdout.
//!
//! ```bash
//! echo "general U1 !linkleetcode alice" | duel-bot --accounts ./usernames.json
//! RUST_LOG=arena=debug DUEL_TIMEOUT_SECS=600 duel-bot
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use arena::{DuelConfig, DuelManager, OracleStats};
use clap::Parser;
use duel_bot::{BotConfig, CommandDispatcher, ConsoleGateway, JsonAccountDirectory, LeetCodeClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Accounts file (overrides DUEL_ACCOUNTS_PATH)
    #[arg(long)]
    accounts: Option<PathBuf>,

    /// GraphQL endpoint (overrides LEETCODE_GRAPHQL_URL)
    #[arg(long)]
    graphql_url: Option<String>,

    /// Duel length in seconds (overrides DUEL_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Seconds between submission polls (overrides DUEL_POLL_INTERVAL_SECS)
    #[arg(long)]
    poll_secs: Option<u64>,

    /// Seconds a challenger has to pick a difficulty (overrides DUEL_SELECTION_TIMEOUT_SECS)
    #[arg(long)]
    selection_secs: Option<u64>,
}

const STATS_INTERVAL: Duration = Duration::from_secs(300);

fn log_oracle_stats(stats: &OracleStats) {
    let snap = stats.snapshot();
    info!(
        queries = snap.queries,
        solved = snap.solved,
        failures = snap.failures,
        outages = snap.outages,
        "Oracle stats"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut bot_config = BotConfig::default();
    if let Some(path) = args.accounts {
        bot_config.accounts_path = path;
    }
    if let Some(url) = args.graphql_url {
        bot_config.graphql_url = url;
    }

    let mut duel_config = DuelConfig::default();
    if let Some(secs) = args.timeout_secs {
        duel_config.duel_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.poll_secs {
        duel_config.poll_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = args.selection_secs {
        duel_config.selection_timeout = Duration::from_secs(secs);
    }

    info!(
        graphql = %bot_config.graphql_url,
        accounts = %bot_config.accounts_path.display(),
        timeout_secs = duel_config.duel_timeout.as_secs(),
        poll_secs = duel_config.poll_interval.as_secs(),
        selection_secs = duel_config.selection_timeout.as_secs(),
        "Duel bot starting"
    );

    let leetcode = Arc::new(LeetCodeClient::new(&bot_config).context("LeetCode client")?);
    let accounts = Arc::new(
        JsonAccountDirectory::open(&bot_config.accounts_path)
            .await
            .context("Failed to open account directory")?,
    );
    if accounts.is_empty().await {
        info!("No linked accounts yet; players start with !linkleetcode <username>");
    } else {
        info!(linked = accounts.len().await, "Account directory ready");
    }
    let console = Arc::new(ConsoleGateway::stdout(&bot_config));

    let manager = DuelManager::new(
        accounts.clone(),
        leetcode.clone(),
        leetcode.clone(),
        console.clone(),
        duel_config,
    )
    .shared();
    let dispatcher = Arc::new(CommandDispatcher::new(manager.clone(), accounts, leetcode));

    let stats = manager.oracle_stats();
    let stats_task = {
        let stats = stats.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(STATS_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                log_oracle_stats(&stats);
            }
        })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let dispatcher = dispatcher.clone();
        let console = console.clone();
        tokio::spawn(async move {
            if let Some(reply) = dispatcher.dispatch_line(&line).await {
                if let Err(e) = console.say(&reply.channel, &reply.text).await {
                    tracing::warn!(error = %e, "Failed to print reply");
                }
            }
        });
    }

    let registry = manager.registry();
    if !registry.is_empty() {
        info!(
            live = registry.len(),
            "Input closed with duels still running; waiting for them or Ctrl-C"
        );
        tokio::select! {
            _ = async {
                while !registry.is_empty() {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            } => info!("All duels finished"),
            res = tokio::signal::ctrl_c() => {
                res.context("Failed to listen for Ctrl-C")?;
            }
        }
    }
    stats_task.abort();
    log_oracle_stats(&stats);
    info!("Shutting down");
    Ok(())
}
