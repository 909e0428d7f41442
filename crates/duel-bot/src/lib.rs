//! LeetCode duel bot
//!
//! Concrete collaborators for the `arena` duel core:
//! - [`leetcode::LeetCodeClient`]: GraphQL problem catalog, submission oracle
//!   and username verification
//! - [`accounts::JsonAccountDirectory`]: participant → username links on disk
//! - [`console::ConsoleGateway`]: announcements printed as `[#channel] text`
//! - [`commands`]: the `!duel` / `!difficulty` / `!linkleetcode` / `!status`
//!   command set

pub mod accounts;
pub mod commands;
pub mod config;
pub mod console;
pub mod leetcode;

pub use accounts::JsonAccountDirectory;
pub use commands::{parse_line, Command, CommandDispatcher, Envelope, HandleVerifier, ParseError, Reply};
pub use config::BotConfig;
pub use console::ConsoleGateway;
pub use leetcode::{LeetCodeClient, LeetCodeError};
