//! LeetCode GraphQL client
//!
//! One HTTP client backs three concerns: drawing candidate problems for the
//! duel catalog, listing recent accepted submissions for the race watcher,
//! and checking that a username exists before it is linked.

use arena::{
    AcceptedSubmission, Candidate, CatalogError, Difficulty, Handle, OracleError,
    ProblemCatalogService, ProblemId, SubmissionOracleService,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::BotConfig;

const QUESTION_LIST_QUERY: &str = r#"
query problemsetQuestionList($categorySlug: String, $limit: Int, $skip: Int, $filters: QuestionListFilterInput) {
  problemsetQuestionList: questionList(categorySlug: $categorySlug, limit: $limit, skip: $skip, filters: $filters) {
    questions: data { title titleSlug difficulty }
  }
}"#;

const QUESTION_PAID_QUERY: &str =
    "query questionTitle($titleSlug: String!) { question(titleSlug: $titleSlug) { isPaidOnly } }";

const RECENT_AC_QUERY: &str = "query getACSubmissions($username: String!, $limit: Int) { recentAcSubmissionList(username: $username, limit: $limit) { titleSlug timestamp } }";

const USER_EXISTS_QUERY: &str =
    "query userPublicProfile($username: String!) { matchedUser(username: $username) { username } }";

/// Error type for LeetCode calls
#[derive(Debug, thiserror::Error)]
pub enum LeetCodeError {
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("LeetCode returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Unexpected response: {0}")]
    Parse(String),
}

impl LeetCodeError {
    fn is_transport(&self) -> bool {
        matches!(self, Self::Client(_) | Self::Request(_) | Self::Status { .. })
    }
}

impl From<LeetCodeError> for CatalogError {
    fn from(e: LeetCodeError) -> Self {
        if e.is_transport() {
            CatalogError::Request(e.to_string())
        } else {
            CatalogError::Response(e.to_string())
        }
    }
}

impl From<LeetCodeError> for OracleError {
    fn from(e: LeetCodeError) -> Self {
        if e.is_transport() {
            OracleError::Request(e.to_string())
        } else {
            OracleError::Response(e.to_string())
        }
    }
}

/// `{ "data": ..., "errors": [...] }` envelope.
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

impl<T> GraphQlResponse<T> {
    fn into_data(self) -> Result<T, LeetCodeError> {
        if !self.errors.is_empty() {
            let messages: Vec<_> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(LeetCodeError::GraphQl(messages.join("; ")));
        }
        self.data
            .ok_or_else(|| LeetCodeError::Parse("response has no data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionListData {
    problemset_question_list: QuestionPage,
}

#[derive(Debug, Deserialize)]
struct QuestionPage {
    #[serde(default)]
    questions: Vec<QuestionSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionSummary {
    title: String,
    title_slug: String,
}

#[derive(Debug, Deserialize)]
struct QuestionData {
    question: Option<QuestionFlags>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionFlags {
    is_paid_only: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentAcData {
    #[serde(default)]
    recent_ac_submission_list: Option<Vec<RecentAc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentAc {
    title_slug: String,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUserData {
    matched_user: Option<Value>,
}

/// Unix seconds as a decimal string, e.g. `"1700000000"`.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, LeetCodeError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| LeetCodeError::Parse(format!("invalid submission timestamp {raw:?}")))
}

fn into_submissions(data: RecentAcData) -> Result<Vec<AcceptedSubmission>, LeetCodeError> {
    data.recent_ac_submission_list
        .unwrap_or_default()
        .into_iter()
        .map(|ac| {
            Ok(AcceptedSubmission {
                timestamp: parse_timestamp(&ac.timestamp)?,
                problem: ProblemId::new(ac.title_slug),
            })
        })
        .collect()
}

/// HTTP client for the LeetCode GraphQL API.
pub struct LeetCodeClient {
    client: reqwest::Client,
    graphql_url: String,
}

impl LeetCodeClient {
    pub fn new(config: &BotConfig) -> Result<Self, LeetCodeError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| LeetCodeError::Client(e.to_string()))?;
        Ok(Self {
            client,
            graphql_url: config.graphql_url.clone(),
        })
    }

    /// Run one GraphQL operation and decode its `data` member.
    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, LeetCodeError> {
        let response = self
            .client
            .post(&self.graphql_url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| LeetCodeError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LeetCodeError::Status { status, body });
        }

        let envelope: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| LeetCodeError::Parse(e.to_string()))?;
        envelope.into_data()
    }

    /// Whether a LeetCode account named `handle` exists.
    pub async fn user_exists(&self, handle: &Handle) -> Result<bool, LeetCodeError> {
        let data: MatchedUserData = self
            .query(USER_EXISTS_QUERY, json!({ "username": handle.as_str() }))
            .await?;
        Ok(data.matched_user.is_some_and(|user| !user.is_null()))
    }

    async fn is_paid_only(&self, slug: &str) -> Result<bool, LeetCodeError> {
        let data: QuestionData = self
            .query(QUESTION_PAID_QUERY, json!({ "titleSlug": slug }))
            .await?;
        data.question
            .map(|q| q.is_paid_only)
            .ok_or_else(|| LeetCodeError::Parse(format!("unknown question {slug}")))
    }
}

#[async_trait]
impl ProblemCatalogService for LeetCodeClient {
    async fn fetch_candidate(
        &self,
        difficulty: Difficulty,
        offset: u32,
    ) -> Result<Option<Candidate>, CatalogError> {
        let page: QuestionListData = self
            .query(
                QUESTION_LIST_QUERY,
                json!({
                    "categorySlug": "",
                    "limit": 1,
                    "skip": offset,
                    "filters": { "difficulty": difficulty.as_filter() },
                }),
            )
            .await?;

        let Some(summary) = page.problemset_question_list.questions.into_iter().next() else {
            debug!(%difficulty, offset, "Empty question page");
            return Ok(None);
        };
        let is_premium = self.is_paid_only(&summary.title_slug).await?;
        Ok(Some(Candidate {
            id: ProblemId::new(summary.title_slug),
            title: summary.title,
            is_premium,
        }))
    }
}

#[async_trait]
impl SubmissionOracleService for LeetCodeClient {
    async fn recent_accepted_submissions(
        &self,
        handle: &Handle,
        limit: u32,
    ) -> Result<Vec<AcceptedSubmission>, OracleError> {
        let data: RecentAcData = self
            .query(
                RECENT_AC_QUERY,
                json!({ "username": handle.as_str(), "limit": limit }),
            )
            .await?;
        Ok(into_submissions(data)?)
    }
}
