use std::path::PathBuf;
use std::time::Duration;

/// Connection and storage settings for the bot.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// LeetCode GraphQL endpoint
    pub graphql_url: String,
    /// Prefix for problem links posted when a duel starts
    pub problem_base_url: String,
    /// JSON file mapping chat participants to LeetCode usernames
    pub accounts_path: PathBuf,
    /// Per-request timeout for GraphQL calls
    pub http_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            graphql_url: std::env::var("LEETCODE_GRAPHQL_URL")
                .unwrap_or_else(|_| "https://leetcode.com/graphql".into()),
            problem_base_url: std::env::var("LEETCODE_PROBLEM_BASE_URL")
                .unwrap_or_else(|_| "https://leetcode.com/problems".into()),
            accounts_path: std::env::var("DUEL_ACCOUNTS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("usernames.json")),
            http_timeout: std::env::var("LEETCODE_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(10)),
        }
    }
}

impl BotConfig {
    /// Link to the problem page for `slug`.
    pub fn problem_url(&self, slug: &str) -> String {
        format!("{}/{}/", self.problem_base_url.trim_end_matches('/'), slug)
    }
}
