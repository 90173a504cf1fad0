//! Evidence provider: ranked web snippets for a query.
//!
//! Provider errors never escape [`web_search`] or [`multi_search`]. A query
//! with no hits renders as [`NO_RESULTS`] and a failed query as
//! `Search failed: <reason>`, so stages can embed the notice as context and
//! keep reasoning.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::backend::http_client;
use crate::config::SearchConfig;

/// Rendered in place of an empty result list.
pub const NO_RESULTS: &str = "No results found.";
/// Longest snippet content kept, in characters.
pub const MAX_SNIPPET_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub title: String,
    pub url: String,
    pub content: String,
}

impl Snippet {
    pub fn new(title: impl Into<String>, url: impl Into<String>, content: &str) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            content: truncate_chars(content, MAX_SNIPPET_CHARS),
        }
    }
}

/// First `max` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvidenceError {
    #[error("search provider not configured: {0}")]
    NotConfigured(String),

    #[error("search transport failed: {0}")]
    Transport(String),

    #[error("search provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unreadable search response: {0}")]
    Decode(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvidenceProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Snippet>, EvidenceError>;
}

// ── Tavily ───────────────────────────────────────────────────────────────────

pub struct TavilyProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl TavilyProvider {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// A missing key is not fatal: every search then reports a failure
    /// notice and the stages reason without evidence.
    pub fn from_config(config: &SearchConfig, api_key: Option<&str>) -> AnyResult<Self> {
        Ok(Self::new(
            http_client(config.request_timeout_secs)?,
            config.base_url.clone(),
            api_key.map(String::from),
        ))
    }
}

pub(crate) fn parse_tavily(resp: &Value) -> Vec<Snippet> {
    resp["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .map(|r| {
                    Snippet::new(
                        r["title"].as_str().unwrap_or_default(),
                        r["url"].as_str().unwrap_or_default(),
                        r["content"].as_str().unwrap_or_default(),
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl EvidenceProvider for TavilyProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Snippet>, EvidenceError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| EvidenceError::NotConfigured("TAVILY_API_KEY is not set".into()))?;
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&json!({
                "api_key": api_key,
                "query": query,
                "search_depth": "basic",
                "max_results": max_results
            }))
            .send()
            .await
            .map_err(|e| EvidenceError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EvidenceError::Status {
                status,
                body: truncate_chars(&body, MAX_SNIPPET_CHARS),
            });
        }

        let resp_json: Value = response
            .json()
            .await
            .map_err(|e| EvidenceError::Decode(e.to_string()))?;
        let mut snippets = parse_tavily(&resp_json);
        snippets.truncate(max_results);
        Ok(snippets)
    }
}

// ── Bundles ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Hits(Vec<Snippet>),
    Empty,
    Failed(String),
}

impl SearchOutcome {
    fn render(&self) -> String {
        match self {
            Self::Hits(snippets) => {
                let mut out = String::new();
                for (i, s) in snippets.iter().enumerate() {
                    let _ = write!(out, "\n[{}] {}\n    URL: {}\n    {}\n", i + 1, s.title, s.url, s.content);
                }
                out.trim().to_string()
            }
            Self::Empty => NO_RESULTS.to_string(),
            Self::Failed(reason) => format!("Search failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEvidence {
    pub query: String,
    pub outcome: SearchOutcome,
}

/// How much of the requested evidence actually arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DegradationLevel {
    /// No query failed (empty results count as answers).
    Full,
    /// Some queries failed.
    Partial,
    /// Every query failed.
    Unavailable,
}

/// Results of several queries, in the order they were issued.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceBundle {
    pub entries: Vec<QueryEvidence>,
}

impl EvidenceBundle {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn degradation(&self) -> DegradationLevel {
        let failed = self
            .entries
            .iter()
            .filter(|e| matches!(e.outcome, SearchOutcome::Failed(_)))
            .count();
        match failed {
            0 => DegradationLevel::Full,
            n if n == self.entries.len() => DegradationLevel::Unavailable,
            _ => DegradationLevel::Partial,
        }
    }

    pub fn snippet_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| match &e.outcome {
                SearchOutcome::Hits(s) => s.len(),
                _ => 0,
            })
            .sum()
    }

    /// `=== <query> ===` headed sections, one per query.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let _ = write!(out, "\n=== {} ===\n{}", entry.query, entry.outcome.render());
        }
        out.trim().to_string()
    }
}

async fn run_query(provider: &dyn EvidenceProvider, query: &str, max_results: usize) -> QueryEvidence {
    let outcome = match provider.search(query, max_results).await {
        Ok(snippets) if snippets.is_empty() => SearchOutcome::Empty,
        Ok(snippets) => {
            debug!(query, hits = snippets.len(), "evidence query");
            SearchOutcome::Hits(snippets)
        }
        Err(e) => {
            warn!(query, error = %e, "evidence query failed");
            SearchOutcome::Failed(e.to_string())
        }
    };
    QueryEvidence {
        query: query.to_string(),
        outcome,
    }
}

/// One query, rendered. Never fails.
pub async fn web_search(provider: &dyn EvidenceProvider, query: &str, max_results: usize) -> String {
    run_query(provider, query, max_results).await.outcome.render()
}

/// Several queries, issued sequentially. Never fails.
pub async fn multi_search(
    provider: &dyn EvidenceProvider,
    queries: &[String],
    max_results: usize,
) -> EvidenceBundle {
    let mut bundle = EvidenceBundle::default();
    for query in queries {
        bundle.entries.push(run_query(provider, query, max_results).await);
    }
    bundle
}

pub type SharedEvidence = Arc<dyn EvidenceProvider>;
