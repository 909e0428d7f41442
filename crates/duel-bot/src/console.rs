//! Console messaging gateway: announcements become `[#channel] text` lines.

use arena::{Announcement, ChannelId, MessagingGateway};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::config::BotConfig;

/// Writes announcements to an async writer, one prefixed line per text line.
pub struct ConsoleGateway<W> {
    out: Mutex<W>,
    config: BotConfig,
}

impl ConsoleGateway<tokio::io::Stdout> {
    pub fn stdout(config: &BotConfig) -> Self {
        Self::new(tokio::io::stdout(), config)
    }
}

impl<W> ConsoleGateway<W>
where
    W: AsyncWrite + Unpin + Send + Sync,
{
    pub fn new(out: W, config: &BotConfig) -> Self {
        Self {
            out: Mutex::new(out),
            config: config.clone(),
        }
    }

    /// Write a plain reply that is not a duel announcement.
    pub async fn say(&self, channel: &ChannelId, text: &str) -> anyhow::Result<()> {
        let mut out = self.out.lock().await;
        for line in text.lines() {
            out.write_all(format!("[#{channel}] {line}\n").as_bytes())
                .await?;
        }
        out.flush().await?;
        Ok(())
    }

    /// Announcement text, with the problem link appended when a duel starts.
    pub fn render(&self, announcement: &Announcement) -> String {
        match announcement {
            Announcement::DuelStarted { problem, .. } => format!(
                "{announcement}\n{}",
                self.config.problem_url(problem.id.as_str())
            ),
            other => other.to_string(),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W> MessagingGateway for ConsoleGateway<W>
where
    W: AsyncWrite + Unpin + Send + Sync,
{
    async fn announce(
        &self,
        channel: &ChannelId,
        announcement: &Announcement,
    ) -> anyhow::Result<()> {
        self.say(channel, &self.render(announcement)).await
    }
}
