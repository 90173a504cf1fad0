//! Runtime configuration for the war room.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. Environment variable overrides (e.g. `WAR_ROOM_ADVOCATE_MODEL`)
//! 2. An optional TOML file (`--config <path>` or `WAR_ROOM_CONFIG`)
//! 3. Built-in defaults
//!
//! Every TOML field is optional; missing fields keep their default.
//!
//! ## Roles
//!
//! | Role      | Agent        | Default provider | Default model             | Temp |
//! |-----------|--------------|------------------|---------------------------|------|
//! | advocate  | Bull         | anthropic        | claude-sonnet-4-6         | 0.4  |
//! | skeptic   | Bear         | groq             | llama-3.3-70b-versatile   | 0.3  |
//! | auditor   | Detective    | groq             | llama-3.3-70b-versatile   | 0.2  |
//! | decision  | Orchestrator | mistral          | mistral-large-latest      | 0.2  |
//! | profile   | (client doc) | groq             | llama-3.3-70b-versatile   | 0.2  |
//!
//! API keys are read from the environment only and never serialized.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use deliberation::AgentRole;
use serde::{Deserialize, Serialize};

const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TAVILY_BASE_URL: &str = "https://api.tavily.com";

const DEFAULT_ADVOCATE_MODEL: &str = "claude-sonnet-4-6";
const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_DECISION_MODEL: &str = "mistral-large-latest";
const DEFAULT_MAX_TOKENS: u32 = 2_000;
const DEFAULT_PROFILE_MAX_TOKENS: u32 = 1_000;
/// Model calls routinely take tens of seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RESULTS_PER_QUERY: usize = 2;
const DEFAULT_OUTPUT_DIR: &str = "outputs";
const DEFAULT_PRODUCT: &str = "ALLYVEX";
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_000;

/// Path to the TOML file, when `--config` is not given.
pub const ENV_CONFIG_PATH: &str = "WAR_ROOM_CONFIG";
const ENV_OUTPUT_DIR: &str = "WAR_ROOM_OUTPUT_DIR";
const ENV_PRODUCT: &str = "WAR_ROOM_PRODUCT";
const ENV_METRICS_PATH: &str = "WAR_ROOM_METRICS_PATH";
const ENV_STRICT_APPROACH: &str = "WAR_ROOM_STRICT_APPROACH";
const ENV_MAX_ATTEMPTS: &str = "WAR_ROOM_MAX_ATTEMPTS";
const ENV_RETRY_BACKOFF_MS: &str = "WAR_ROOM_RETRY_BACKOFF_MS";
const ENV_SEARCH_RESULTS: &str = "WAR_ROOM_SEARCH_RESULTS";
const ENV_TAVILY_BASE_URL: &str = "WAR_ROOM_TAVILY_BASE_URL";
const ENV_TAVILY_API_KEY: &str = "TAVILY_API_KEY";

// ── Providers ────────────────────────────────────────────────────────────────

/// Model-serving providers a role can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    Groq,
    Mistral,
    OpenAi,
}

impl Provider {
    pub const ALL: [Provider; 4] = [Self::Anthropic, Self::Groq, Self::Mistral, Self::OpenAi];

    /// Environment variable holding this provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Mistral => "MISTRAL_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// Whether the provider speaks the OpenAI chat-completions dialect.
    pub fn is_openai_compatible(self) -> bool {
        !matches!(self, Self::Anthropic)
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Some(Self::Anthropic),
            "groq" => Some(Self::Groq),
            "mistral" => Some(Self::Mistral),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::Groq => write!(f, "groq"),
            Self::Mistral => write!(f, "mistral"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

// ── Roles ────────────────────────────────────────────────────────────────────

/// Model binding for one role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub provider: Provider,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a JSON object response (OpenAI-compatible only).
    pub json_mode: bool,
}

impl RoleConfig {
    fn new(provider: Provider, model: &str, temperature: f32, json_mode: bool) -> Self {
        Self {
            provider,
            model: model.to_string(),
            temperature,
            max_tokens: DEFAULT_MAX_TOKENS,
            json_mode,
        }
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "roles.{name}.temperature must be in [0, 2], got {}",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            return Err(format!("roles.{name}.max_tokens must be > 0"));
        }
        if self.model.trim().is_empty() {
            return Err(format!("roles.{name}.model must not be empty"));
        }
        Ok(())
    }
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self::new(Provider::Groq, DEFAULT_GROQ_MODEL, 0.2, false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolesConfig {
    pub advocate: RoleConfig,
    pub skeptic: RoleConfig,
    pub auditor: RoleConfig,
    pub decision: RoleConfig,
    /// Client-profile generation; not a pipeline stage.
    pub profile: RoleConfig,
}

impl Default for RolesConfig {
    fn default() -> Self {
        Self {
            advocate: RoleConfig::new(Provider::Anthropic, DEFAULT_ADVOCATE_MODEL, 0.4, false),
            skeptic: RoleConfig::new(Provider::Groq, DEFAULT_GROQ_MODEL, 0.3, true),
            auditor: RoleConfig::new(Provider::Groq, DEFAULT_GROQ_MODEL, 0.2, false),
            decision: RoleConfig::new(Provider::Mistral, DEFAULT_DECISION_MODEL, 0.2, true),
            profile: RoleConfig {
                max_tokens: DEFAULT_PROFILE_MAX_TOKENS,
                ..RoleConfig::new(Provider::Groq, DEFAULT_GROQ_MODEL, 0.2, false)
            },
        }
    }
}

impl RolesConfig {
    pub fn get(&self, role: AgentRole) -> &RoleConfig {
        match role {
            AgentRole::Advocate => &self.advocate,
            AgentRole::Skeptic => &self.skeptic,
            AgentRole::Auditor => &self.auditor,
            AgentRole::Decision => &self.decision,
        }
    }

    fn get_mut(&mut self, role: AgentRole) -> &mut RoleConfig {
        match role {
            AgentRole::Advocate => &mut self.advocate,
            AgentRole::Skeptic => &mut self.skeptic,
            AgentRole::Auditor => &mut self.auditor,
            AgentRole::Decision => &mut self.decision,
        }
    }

    /// Providers referenced by any role, deduplicated, in role order.
    pub fn providers(&self) -> Vec<Provider> {
        let mut seen = Vec::new();
        for p in AgentRole::ALL
            .iter()
            .map(|r| self.get(*r).provider)
            .chain(std::iter::once(self.profile.provider))
        {
            if !seen.contains(&p) {
                seen.push(p);
            }
        }
        seen
    }
}

// ── Providers / search / output / pipeline ──────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub anthropic_base_url: String,
    pub groq_base_url: String,
    pub mistral_base_url: String,
    pub openai_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            anthropic_base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            groq_base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            mistral_base_url: DEFAULT_MISTRAL_BASE_URL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ProvidersConfig {
    pub fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::Anthropic => &self.anthropic_base_url,
            Provider::Groq => &self.groq_base_url,
            Provider::Mistral => &self.mistral_base_url,
            Provider::OpenAi => &self.openai_base_url,
        }
    }

    fn base_url_mut(&mut self, provider: Provider) -> &mut String {
        match provider {
            Provider::Anthropic => &mut self.anthropic_base_url,
            Provider::Groq => &mut self.groq_base_url,
            Provider::Mistral => &mut self.mistral_base_url,
            Provider::OpenAi => &mut self.openai_base_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub base_url: String,
    pub results_per_query: usize,
    pub request_timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TAVILY_BASE_URL.to_string(),
            results_per_query: DEFAULT_RESULTS_PER_QUERY,
            request_timeout_secs: DEFAULT_SEARCH_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory rendered documents are written to.
    pub dir: PathBuf,
    /// Product prefix of every artifact filename.
    pub product: String,
    /// Append one JSON line of run metrics here when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            product: DEFAULT_PRODUCT.to_string(),
            metrics_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reject decision output whose proposed approach contradicts its verdicts.
    pub strict_approach: bool,
    /// Backend calls per stage; 1 disables retries.
    pub max_attempts: u32,
    /// Linear backoff unit between retried backend calls.
    pub retry_backoff_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict_approach: false,
            max_attempts: 1,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
        }
    }
}

// ── Keys ─────────────────────────────────────────────────────────────────────

/// Provider credentials. Debug output never shows the values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    providers: HashMap<Provider, String>,
    tavily: Option<String>,
}

impl ApiKeys {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let providers = Provider::ALL
            .iter()
            .filter_map(|p| non_empty(lookup(p.api_key_env())).map(|k| (*p, k)))
            .collect();
        Self {
            providers,
            tavily: non_empty(lookup(ENV_TAVILY_API_KEY)),
        }
    }

    pub fn provider(&self, provider: Provider) -> Option<&str> {
        self.providers.get(&provider).map(String::as_str)
    }

    pub fn tavily(&self) -> Option<&str> {
        self.tavily.as_deref()
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set: Vec<String> = self.providers.keys().map(|p| p.to_string()).collect();
        set.sort();
        f.debug_struct("ApiKeys")
            .field("providers", &set)
            .field("tavily", &self.tavily.is_some())
            .finish()
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ── Top level ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarRoomConfig {
    pub roles: RolesConfig,
    pub providers: ProvidersConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
    #[serde(skip)]
    pub keys: ApiKeys,
}

impl WarRoomConfig {
    /// Defaults, then `path` (or `$WAR_ROOM_CONFIG`), then the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(ENV_CONFIG_PATH).map(PathBuf::from));
        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        config.apply_env(|k| env::var(k).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Deep-merge `text` over the defaults, so a partial `[roles.skeptic]`
    /// table keeps the skeptic's own defaults for the fields it omits.
    pub fn from_toml(text: &str) -> Result<Self> {
        let overlay: toml::Table = text.parse()?;
        let mut merged = toml::Value::try_from(Self::default())?;
        merge_toml(&mut merged, toml::Value::Table(overlay));
        Ok(merged.try_into()?)
    }

    /// Overlay environment overrides. `lookup` stands in for `env::var`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        for role in AgentRole::ALL {
            let prefix = format!("WAR_ROOM_{}", role_key(role).to_ascii_uppercase());
            let rc = self.roles.get_mut(role);
            if let Some(raw) = lookup(&format!("{prefix}_PROVIDER")) {
                rc.provider = Provider::parse(&raw)
                    .with_context(|| format!("{prefix}_PROVIDER: unknown provider {raw:?}"))?;
            }
            if let Some(model) = non_empty(lookup(&format!("{prefix}_MODEL"))) {
                rc.model = model;
            }
            if let Some(raw) = lookup(&format!("{prefix}_TEMPERATURE")) {
                rc.temperature = parse_env(&format!("{prefix}_TEMPERATURE"), &raw)?;
            }
        }
        for provider in Provider::ALL {
            let key = format!("WAR_ROOM_{}_BASE_URL", provider.to_string().to_ascii_uppercase());
            if let Some(url) = non_empty(lookup(&key)) {
                *self.providers.base_url_mut(provider) = url;
            }
        }
        if let Some(url) = non_empty(lookup(ENV_TAVILY_BASE_URL)) {
            self.search.base_url = url;
        }
        if let Some(raw) = lookup(ENV_SEARCH_RESULTS) {
            self.search.results_per_query = parse_env(ENV_SEARCH_RESULTS, &raw)?;
        }
        if let Some(dir) = non_empty(lookup(ENV_OUTPUT_DIR)) {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(product) = lookup(ENV_PRODUCT) {
            self.output.product = product;
        }
        if let Some(path) = non_empty(lookup(ENV_METRICS_PATH)) {
            self.output.metrics_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = lookup(ENV_STRICT_APPROACH) {
            self.pipeline.strict_approach = parse_bool(ENV_STRICT_APPROACH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            self.pipeline.max_attempts = parse_env(ENV_MAX_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RETRY_BACKOFF_MS) {
            self.pipeline.retry_backoff_ms = parse_env(ENV_RETRY_BACKOFF_MS, &raw)?;
        }
        self.keys = ApiKeys::from_lookup(lookup);
        Ok(())
    }

    /// Validate the config; return an error string if invalid.
    pub fn validate(&self) -> Result<(), String> {
        for role in AgentRole::ALL {
            self.roles.get(role).validate(role_key(role))?;
        }
        self.roles.profile.validate("profile")?;
        for (name, rc) in self.roles_by_name() {
            if rc.json_mode && !rc.provider.is_openai_compatible() {
                return Err(format!(
                    "roles.{name}.json_mode is not supported by provider {}",
                    rc.provider
                ));
            }
        }
        if self.providers.request_timeout_secs == 0 {
            return Err("providers.request_timeout_secs must be > 0".to_string());
        }
        if self.search.results_per_query == 0 {
            return Err("search.results_per_query must be > 0".to_string());
        }
        if self.search.request_timeout_secs == 0 {
            return Err("search.request_timeout_secs must be > 0".to_string());
        }
        let product = self.output.product.trim();
        if product.is_empty() {
            return Err("output.product must not be empty".to_string());
        }
        if product.contains(['/', '\\', '\0']) {
            return Err(format!(
                "output.product must be usable in a filename, got {product:?}"
            ));
        }
        if self.pipeline.max_attempts == 0 {
            return Err("pipeline.max_attempts must be >= 1".to_string());
        }
        Ok(())
    }

    fn roles_by_name(&self) -> impl Iterator<Item = (&'static str, &RoleConfig)> {
        AgentRole::ALL
            .into_iter()
            .map(|r| (role_key(r), self.roles.get(r)))
            .chain(std::iter::once(("profile", &self.roles.profile)))
    }
}

/// TOML / env key of a stage role.
pub fn role_key(role: AgentRole) -> &'static str {
    match role {
        AgentRole::Advocate => "advocate",
        AgentRole::Skeptic => "skeptic",
        AgentRole::Auditor => "auditor",
        AgentRole::Decision => "decision",
    }
}

fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) => merge_toml(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key}: cannot parse {raw:?}"))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("{key}: expected a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn default_config_validates() {
        let config = WarRoomConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.roles.advocate.provider, Provider::Anthropic);
        assert_eq!(config.roles.advocate.model, "claude-sonnet-4-6");
        assert_eq!(config.roles.skeptic.temperature, 0.3);
        assert_eq!(config.roles.decision.model, "mistral-large-latest");
        assert_eq!(config.search.results_per_query, 2);
        assert_eq!(config.output.product, "ALLYVEX");
        assert_eq!(config.pipeline.max_attempts, 1);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = WarRoomConfig::from_toml(
            r#"
            [roles.skeptic]
            model = "llama-3.1-8b-instant"

            [output]
            dir = "/tmp/reports"
            "#,
        )
        .unwrap();
        assert_eq!(config.roles.skeptic.model, "llama-3.1-8b-instant");
        assert_eq!(config.roles.skeptic.provider, Provider::Groq);
        assert_eq!(config.roles.skeptic.temperature, 0.3);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.output.product, "ALLYVEX");
    }

    #[test]
    fn env_overrides_toml() {
        let mut config = WarRoomConfig::from_toml(
            r#"
            [roles.decision]
            provider = "openai"
            model = "gpt-4o"
            "#,
        )
        .unwrap();
        config
            .apply_env(env_of(&[
                ("WAR_ROOM_DECISION_MODEL", "gpt-4.1"),
                ("WAR_ROOM_MAX_ATTEMPTS", "3"),
                ("WAR_ROOM_STRICT_APPROACH", "true"),
                ("OPENAI_API_KEY", "sk-test"),
                ("GROQ_API_KEY", "  "),
            ]))
            .unwrap();
        assert_eq!(config.roles.decision.provider, Provider::OpenAi);
        assert_eq!(config.roles.decision.model, "gpt-4.1");
        assert_eq!(config.pipeline.max_attempts, 3);
        assert!(config.pipeline.strict_approach);
        assert_eq!(config.keys.provider(Provider::OpenAi), Some("sk-test"));
        assert_eq!(config.keys.provider(Provider::Groq), None);
    }

    #[test]
    fn bad_env_value_is_an_error() {
        let mut config = WarRoomConfig::default();
        let err = config
            .apply_env(env_of(&[("WAR_ROOM_MAX_ATTEMPTS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("WAR_ROOM_MAX_ATTEMPTS"));

        let err = config
            .apply_env(env_of(&[("WAR_ROOM_SKEPTIC_PROVIDER", "bedrock")]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown provider"));
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut config = WarRoomConfig::default();
        config.roles.auditor.temperature = 2.5;
        assert!(config.validate().unwrap_err().contains("roles.auditor.temperature"));

        let mut config = WarRoomConfig::default();
        config.roles.advocate.max_tokens = 0;
        assert!(config.validate().unwrap_err().contains("max_tokens"));

        let mut config = WarRoomConfig::default();
        config.pipeline.max_attempts = 0;
        assert!(config.validate().unwrap_err().contains("max_attempts"));

        let mut config = WarRoomConfig::default();
        config.output.product = "  ".into();
        assert!(config.validate().unwrap_err().contains("output.product"));

        let mut config = WarRoomConfig::default();
        config.output.product = "../x".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_mode_requires_openai_dialect() {
        let mut config = WarRoomConfig::default();
        config.roles.advocate.json_mode = true;
        assert!(config.validate().unwrap_err().contains("json_mode"));
    }

    #[test]
    fn keys_are_redacted_in_debug() {
        let keys = ApiKeys::from_lookup(env_of(&[("ANTHROPIC_API_KEY", "sk-ant-secret")]));
        let shown = format!("{keys:?}");
        assert!(!shown.contains("secret"));
        assert!(shown.contains("anthropic"));
    }

    #[test]
    fn providers_are_deduplicated() {
        let roles = RolesConfig::default();
        assert_eq!(
            roles.providers(),
            vec![Provider::Anthropic, Provider::Groq, Provider::Mistral]
        );
    }
}
