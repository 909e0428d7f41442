//! Chat command parsing and dispatch.
//!
//! Input is one command per line: `<channel> <author> !<command> [arg]`.
//! Duel commands go to the [`DuelManager`], which announces outcomes and
//! rejections itself; linking and status produce a direct [`Reply`].

use std::sync::Arc;

use arena::{
    ChannelId, Difficulty, Duel, DuelStatus, Handle, ParticipantId, SharedDuelManager,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::accounts::JsonAccountDirectory;
use crate::leetcode::LeetCodeClient;

pub const USAGE: &str = "Commands: !linkleetcode <username> | !duel <@opponent> | !difficulty <easy|medium|hard> | !status";

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LinkLeetCode(Handle),
    Duel(ParticipantId),
    Difficulty(Difficulty),
    Status,
}

/// A command together with where it was said and by whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub channel: ChannelId,
    pub author: ParticipantId,
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected `<channel> <author> !<command>`")]
    Malformed,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("`!{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("`{0}` is not a difficulty; use easy, medium or hard")]
    BadDifficulty(String),
}

impl ParseError {
    /// Error text followed by the command summary.
    pub fn usage(&self) -> String {
        format!("❌ {self}\n{USAGE}")
    }
}

/// Accept both raw ids and `<@id>` mentions.
fn participant_arg(raw: &str) -> ParticipantId {
    let id = raw
        .strip_prefix("<@")
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(raw);
    ParticipantId::new(id.trim_start_matches('!'))
}

/// Parse one input line. `Ok(None)` for blank lines and ordinary chatter.
pub fn parse_line(line: &str) -> Result<Option<Envelope>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(channel) = words.next() else {
        return Ok(None);
    };
    let (Some(author), Some(verb)) = (words.next(), words.next()) else {
        return Err(ParseError::Malformed);
    };
    let Some(name) = verb.strip_prefix('!') else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match name.to_ascii_lowercase().as_str() {
        "linkleetcode" => Command::LinkLeetCode(Handle::new(
            arg.ok_or(ParseError::MissingArgument("linkleetcode"))?,
        )),
        "duel" => Command::Duel(participant_arg(
            arg.ok_or(ParseError::MissingArgument("duel"))?,
        )),
        "difficulty" => {
            let raw = arg.ok_or(ParseError::MissingArgument("difficulty"))?;
            Command::Difficulty(
                raw.parse()
                    .map_err(|_| ParseError::BadDifficulty(raw.to_string()))?,
            )
        }
        "status" => Command::Status,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    Ok(Some(Envelope {
        channel: ChannelId::new(channel),
        author: ParticipantId::new(author),
        command,
    }))
}

/// Confirms a LeetCode username exists before it is linked.
#[async_trait]
pub trait HandleVerifier: Send + Sync {
    async fn handle_exists(&self, handle: &Handle) -> anyhow::Result<bool>;
}

#[async_trait]
impl HandleVerifier for LeetCodeClient {
    async fn handle_exists(&self, handle: &Handle) -> anyhow::Result<bool> {
        Ok(self.user_exists(handle).await?)
    }
}

/// Text addressed straight back to the channel a command came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub channel: ChannelId,
    pub text: String,
}

impl Reply {
    fn new(channel: &ChannelId, text: impl Into<String>) -> Self {
        Self {
            channel: channel.clone(),
            text: text.into(),
        }
    }
}

/// Routes parsed commands to the account directory and the duel manager.
pub struct CommandDispatcher {
    manager: SharedDuelManager,
    accounts: Arc<JsonAccountDirectory>,
    verifier: Arc<dyn HandleVerifier>,
}

impl CommandDispatcher {
    pub fn new(
        manager: SharedDuelManager,
        accounts: Arc<JsonAccountDirectory>,
        verifier: Arc<dyn HandleVerifier>,
    ) -> Self {
        Self {
            manager,
            accounts,
            verifier,
        }
    }

    /// Handle one input line.
    ///
    /// Parse errors on a line with a recognisable channel are answered with
    /// the usage text; lines without one are dropped.
    pub async fn dispatch_line(&self, line: &str) -> Option<Reply> {
        match parse_line(line) {
            Ok(Some(envelope)) => self.dispatch(envelope).await,
            Ok(None) => None,
            Err(e) => {
                debug!(line, error = %e, "Unparsable command");
                line.split_whitespace()
                    .next()
                    .map(|channel| Reply::new(&ChannelId::new(channel), e.usage()))
            }
        }
    }

    pub async fn dispatch(&self, envelope: Envelope) -> Option<Reply> {
        let Envelope {
            channel,
            author,
            command,
        } = envelope;

        match command {
            Command::LinkLeetCode(handle) => Some(self.link(&channel, &author, handle).await),
            Command::Duel(opponent) => {
                // Rejections are announced by the manager.
                let _ = self.manager.request_duel(channel, author, opponent).await;
                None
            }
            Command::Difficulty(difficulty) => {
                if let Ok(started) = self
                    .manager
                    .select_difficulty(channel.clone(), author, difficulty)
                    .await
                {
                    debug!(%channel, duel_id = %started.duel_id, "Race watcher detached");
                }
                None
            }
            Command::Status => Some(self.status(&channel)),
        }
    }

    async fn link(&self, channel: &ChannelId, author: &ParticipantId, handle: Handle) -> Reply {
        match self.verifier.handle_exists(&handle).await {
            Ok(true) => {}
            Ok(false) => {
                return Reply::new(
                    channel,
                    format!("❌ LeetCode user `{handle}` does not exist."),
                )
            }
            Err(e) => {
                warn!(%handle, error = %e, "Handle verification failed");
                return Reply::new(channel, "Couldn't reach LeetCode. Try again later.");
            }
        }

        match self.accounts.link(author, &handle).await {
            Ok(()) => {
                info!(%channel, participant = %author, %handle, "Linked via chat");
                Reply::new(
                    channel,
                    format!("✅ {} linked to LeetCode user `{handle}`.", author.mention()),
                )
            }
            Err(e) => {
                warn!(error = %e, "Failed to store account link");
                Reply::new(channel, "❌ Couldn't save your username. Try again later.")
            }
        }
    }

    fn status(&self, channel: &ChannelId) -> Reply {
        Reply::new(channel, status_text(self.manager.duel(channel).as_ref()))
    }
}

/// `!status` text. A resolved duel still waiting to be released counts as
/// no duel; outcomes are only ever announced.
fn status_text(duel: Option<&Duel>) -> String {
    let Some(duel) = duel.filter(|d| !d.status().is_terminal()) else {
        return "No duel in this channel.".to_string();
    };
    let [challenger, opponent] = duel.participants();
    let pair = format!("{} vs {}", challenger.id.mention(), opponent.id.mention());
    match (duel.status(), duel.problem()) {
        (DuelStatus::Active, Some(problem)) => {
            format!("{pair}: racing on **{}**.", problem.title)
        }
        (DuelStatus::Forming, _) if duel.is_drawing() => format!("{pair}: fetching a problem."),
        (DuelStatus::Forming, _) => format!("{pair}: waiting for a difficulty."),
        (status, _) => format!("{pair}: {status}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena::{DuelOutcome, Participant, Problem};
    use chrono::Utc;
    use std::time::Duration;

    fn parsed(line: &str) -> Envelope {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn test_parse_link() {
        let env = parsed("general U1 !linkleetcode alice");
        assert_eq!(env.channel.as_str(), "general");
        assert_eq!(env.author.as_str(), "U1");
        assert_eq!(env.command, Command::LinkLeetCode(Handle::new("alice")));
    }

    #[test]
    fn test_parse_duel_accepts_mentions() {
        assert_eq!(
            parsed("c1 U1 !duel <@U2>").command,
            Command::Duel(ParticipantId::new("U2"))
        );
        assert_eq!(
            parsed("c1 U1 !duel <@!U2>").command,
            Command::Duel(ParticipantId::new("U2"))
        );
        assert_eq!(
            parsed("c1 U1 !duel U2").command,
            Command::Duel(ParticipantId::new("U2"))
        );
    }

    #[test]
    fn test_parse_difficulty() {
        assert_eq!(
            parsed("c1 U1 !difficulty HARD").command,
            Command::Difficulty(Difficulty::Hard)
        );
        assert_eq!(
            parse_line("c1 U1 !difficulty extreme"),
            Err(ParseError::BadDifficulty("extreme".into()))
        );
    }

    #[test]
    fn test_parse_status_and_chatter() {
        assert_eq!(parsed("c1 U1 !status").command, Command::Status);
        assert_eq!(parse_line("c1 U1 hello there"), Ok(None));
        assert_eq!(parse_line("   "), Ok(None));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("c1"), Err(ParseError::Malformed));
        assert_eq!(
            parse_line("c1 U1 !duel"),
            Err(ParseError::MissingArgument("duel"))
        );
        assert_eq!(
            parse_line("c1 U1 !dance"),
            Err(ParseError::UnknownCommand("dance".into()))
        );
        assert!(ParseError::Malformed.usage().contains("!difficulty"));
    }

    fn duel() -> Duel {
        let p = |id: &str, handle: &str| Participant {
            id: id.into(),
            handle: handle.into(),
        };
        Duel::new("c1".into(), p("U1", "alice"), p("U2", "bob"))
    }

    fn two_sum() -> Problem {
        Problem {
            id: "two-sum".into(),
            title: "Two Sum".into(),
        }
    }

    #[test]
    fn test_status_follows_lifecycle() {
        assert_eq!(status_text(None), "No duel in this channel.");

        let mut d = duel();
        assert!(status_text(Some(&d)).contains("waiting for a difficulty"));

        d.begin_draw().unwrap();
        assert!(status_text(Some(&d)).contains("fetching a problem"));

        d.activate(two_sum(), Utc::now(), Duration::from_secs(1800))
            .unwrap();
        assert_eq!(
            status_text(Some(&d)),
            "<@U1> vs <@U2>: racing on **Two Sum**."
        );
    }

    #[test]
    fn test_resolved_duel_reads_as_empty_channel() {
        let mut d = duel();
        d.activate(two_sum(), Utc::now(), Duration::from_secs(1800))
            .unwrap();
        d.resolve(DuelOutcome::Winner("U2".into())).unwrap();
        assert_eq!(status_text(Some(&d)), "No duel in this channel.");
    }
}
