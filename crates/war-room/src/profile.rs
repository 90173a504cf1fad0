//! Client profile: the selling company's self-description handed to every
//! stage as opaque context.
//!
//! [`ResearchProfileGenerator`] builds one from two sources, the client's own
//! website and external search results. Either may come back empty; both
//! empty is a [`ProfileError::NoContent`], which callers surface as a user
//! error rather than a server fault.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use deliberation::{InputValidationError, Target};
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{BackendError, BackendSet, CompletionRequest, ReasoningBackend};
use crate::config::{RoleConfig, WarRoomConfig};
use crate::evidence::{truncate_chars, SharedEvidence, MAX_SNIPPET_CHARS};

/// Lines of page text kept after stripping markup.
pub const MAX_PAGE_LINES: usize = 200;
/// Results requested per external query.
pub const PROFILE_RESULTS_PER_QUERY: usize = 3;
const SCRAPE_TIMEOUT_SECS: u64 = 15;
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const GENERATOR_PROMPT: &str = "\
You are a business analyst. You have been given content about a company from two sources: \
their own website and external news or articles about them.

Produce a clean structured client profile document that AI sales agents will use to find \
the right CUSTOMERS and BUSINESS PARTNERS for this company.

Structure your output exactly as follows:

COMPANY NAME:
WHAT THEY DO: (core product or service in 2-3 plain sentences)
WHO THEY SELL TO: (company size, industry, decision maker role)
PROBLEMS THEY SOLVE: (3-5 specific problems)
KEY STRENGTHS: (3-5 differentiators)
VALUE PROPOSITION:
TECHNOLOGIES AND INTEGRATIONS:
IDEAL CUSTOMER SCALE: (employee count, revenue range, industry)
IDEAL PARTNER PROFILE: (complementary products, shared customer base, integration potential)
RECENT DEVELOPMENTS: (launches, partnerships, growth signals)

OUTPUT RULES:
- Use actual details from the content provided
- Do not invent anything not present in the source material
- Skip any section where no relevant information was found
- Write in plain professional English
- Maximum 400 words total";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    InvalidUrl(#[from] InputValidationError),

    #[error("could not retrieve any content for {url}; check that the URL is correct and publicly accessible")]
    NoContent { url: String },

    #[error("profile generation failed: {0}")]
    Backend(#[from] BackendError),

    #[error("generated profile is empty")]
    Empty,
}

impl ProfileError {
    /// Whether the caller can fix this by supplying different input.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::InvalidUrl(_) | Self::NoContent { .. })
    }
}

#[async_trait]
pub trait ProfileGenerator: Send + Sync {
    async fn generate(&self, url: &str) -> Result<String, ProfileError>;
}

/// Caller-supplied profile text, returned as is.
pub struct StaticProfile(pub String);

#[async_trait]
impl ProfileGenerator for StaticProfile {
    async fn generate(&self, _url: &str) -> Result<String, ProfileError> {
        Ok(self.0.clone())
    }
}

// ── Scraping ─────────────────────────────────────────────────────────────────

/// Fetches a page as readable text. `None` when nothing usable came back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Option<String>;
}

/// Removes noise elements and markup from HTML.
pub struct HtmlStripper {
    noise: Vec<Regex>,
    void_noise: Regex,
    tags: Regex,
}

impl HtmlStripper {
    pub fn new() -> AnyResult<Self> {
        let noise = [
            "script", "style", "nav", "footer", "header", "aside", "form", "iframe", "noscript", "svg",
        ]
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")))
        .collect::<Result<Vec<_>, _>>()
        .context("compiling noise patterns")?;
        Ok(Self {
            noise,
            void_noise: Regex::new(r"(?is)<img\b[^>]*>|<!--.*?-->").context("compiling void pattern")?,
            tags: Regex::new(r"(?s)<[^>]+>").context("compiling tag pattern")?,
        })
    }

    /// Visible text, one trimmed non-empty line per block, capped at
    /// [`MAX_PAGE_LINES`].
    pub fn strip(&self, html: &str) -> String {
        let mut text = html.to_string();
        for re in &self.noise {
            text = re.replace_all(&text, "").into_owned();
        }
        text = self.void_noise.replace_all(&text, "").into_owned();
        text = self.tags.replace_all(&text, "\n").into_owned();
        let text = text
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            // Last, so an escaped entity decodes only once.
            .replace("&amp;", "&");
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(MAX_PAGE_LINES)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
    stripper: HtmlStripper,
}

impl HttpPageFetcher {
    pub fn new() -> AnyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("building scrape client")?;
        Ok(Self {
            client,
            stripper: HtmlStripper::new()?,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        let url = if url.starts_with("http") {
            url.to_string()
        } else {
            format!("https://{url}")
        };
        let html = match self.client.get(&url).send().await.and_then(|r| r.error_for_status()) {
            Ok(resp) => resp.text().await.ok()?,
            Err(e) => {
                warn!(url = %url, error = %e, "scrape failed");
                return None;
            }
        };
        let text = self.stripper.strip(&html);
        (!text.is_empty()).then_some(text)
    }
}

// ── Research generator ───────────────────────────────────────────────────────

pub struct ResearchProfileGenerator {
    backend: Arc<dyn ReasoningBackend>,
    config: RoleConfig,
    evidence: SharedEvidence,
    fetcher: Arc<dyn PageFetcher>,
}

impl ResearchProfileGenerator {
    pub fn new(
        backend: Arc<dyn ReasoningBackend>,
        config: RoleConfig,
        evidence: SharedEvidence,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            backend,
            config,
            evidence,
            fetcher,
        }
    }

    pub fn from_config(
        config: &WarRoomConfig,
        backends: &BackendSet,
        evidence: SharedEvidence,
    ) -> AnyResult<Self> {
        let rc = config.roles.profile.clone();
        let backend = backends
            .get(rc.provider)
            .with_context(|| format!("no backend for provider {} (profile)", rc.provider))?;
        Ok(Self::new(backend, rc, evidence, Arc::new(HttpPageFetcher::new()?)))
    }

    async fn external_sources(&self, name: &str) -> String {
        let queries = [
            format!("{name} product service what they do"),
            format!("{name} customers use case 2025"),
        ];
        let mut blocks = Vec::new();
        for query in &queries {
            match self.evidence.search(query, PROFILE_RESULTS_PER_QUERY).await {
                Ok(snippets) => blocks.extend(snippets.into_iter().map(|s| {
                    format!(
                        "[{}]\n{}\nSource: {}",
                        s.title,
                        truncate_chars(&s.content, MAX_SNIPPET_CHARS),
                        s.url
                    )
                })),
                Err(e) => warn!(query = %query, error = %e, "profile search failed"),
            }
        }
        blocks.join("\n\n")
    }
}

pub(crate) fn profile_user_message(url: &str, name: &str, website: &str, external: &str) -> String {
    let mut combined = String::new();
    if !website.is_empty() {
        combined.push_str(&format!("=== WEBSITE CONTENT ===\n{website}\n\n"));
    }
    if !external.is_empty() {
        combined.push_str(&format!("=== EXTERNAL SOURCES ===\n{external}"));
    }
    format!(
        "Company URL: {url}\nCompany Name: {name}\n\n{combined}\n\nGenerate the structured client profile document."
    )
}

#[async_trait]
impl ProfileGenerator for ResearchProfileGenerator {
    async fn generate(&self, url: &str) -> Result<String, ProfileError> {
        let target = Target::parse(url)?;

        let website = self.fetcher.fetch_text(url).await.unwrap_or_default();
        let external = self.external_sources(&target.name).await;
        info!(
            company = %target.name,
            website_chars = website.len(),
            external_chars = external.len(),
            "profile sources gathered"
        );
        if website.is_empty() && external.is_empty() {
            return Err(ProfileError::NoContent { url: url.to_string() });
        }

        let request = CompletionRequest::for_role(
            &self.config,
            GENERATOR_PROMPT,
            profile_user_message(url, &target.name, &website, &external),
        );
        let profile = self.backend.complete(&request).await?.trim().to_string();
        if profile.is_empty() {
            return Err(ProfileError::Empty);
        }
        info!(company = %target.name, chars = profile.len(), "client profile generated");
        Ok(profile)
    }
}
