//! Target company identity: domain normalization and display names.
//!
//! A run starts from a raw caller-supplied domain string. Two pure functions
//! turn it into the immutable [`Target`] every stage receives:
//!
//! ```text
//! "https://www.Acme-Corp.io/"
//!   → normalize_domain → "acme-corp.io"
//!   → display_name     → "Acme Corp"
//! ```
//!
//! Both functions are fixpoints: applying them to their own output returns
//! the same value.

use serde::{Deserialize, Serialize};

use crate::error::InputValidationError;

/// Suffixes stripped from the host before deriving a display name.
///
/// Longest-first is not required: stripping loops until nothing matches.
const KNOWN_TLD_SUFFIXES: &[&str] = &[
    ".com", ".io", ".ai", ".co", ".org", ".net", ".dev", ".app", ".tech", ".xyz", ".info",
    ".biz", ".cloud", ".so", ".sh", ".gov", ".edu", ".uk", ".us", ".eu", ".de", ".fr", ".in",
    ".ca", ".au",
];

/// The company being evaluated. Constructed once per run, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Normalized domain (`acme-corp.io`).
    pub domain: String,
    /// Human-readable company name derived from the domain (`Acme Corp`).
    pub name: String,
}

impl Target {
    /// Build a target from raw caller input.
    ///
    /// # Errors
    ///
    /// Returns [`InputValidationError`] when the domain is empty after
    /// normalization or contains whitespace.
    pub fn parse(raw_domain: &str) -> Result<Self, InputValidationError> {
        let domain = normalize_domain(raw_domain)?;
        let name = display_name(&domain);
        Ok(Self { domain, name })
    }

    /// Company name with whitespace replaced by underscores, for filenames.
    pub fn file_stem(&self) -> String {
        self.name
            .split_whitespace()
            .map(|w| {
                w.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
                    .collect::<String>()
            })
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.domain)
    }
}

/// Normalize a raw domain: lowercase, strip scheme, strip `www.`, strip
/// trailing slashes.
///
/// # Errors
///
/// [`InputValidationError::EmptyDomain`] when nothing is left,
/// [`InputValidationError::InvalidDomain`] when the result contains whitespace.
pub fn normalize_domain(raw: &str) -> Result<String, InputValidationError> {
    let mut current = raw.trim().to_lowercase();
    loop {
        let next = strip_once(&current);
        if next == current {
            break;
        }
        current = next;
    }

    if current.is_empty() {
        return Err(InputValidationError::EmptyDomain);
    }
    if current.chars().any(char::is_whitespace) {
        return Err(InputValidationError::InvalidDomain(current));
    }
    Ok(current)
}

fn strip_once(input: &str) -> String {
    let mut s = input.trim();
    if let Some(idx) = s.find("://") {
        let scheme = &s[..idx];
        if !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        {
            s = &s[idx + 3..];
        }
    }
    if let Some(rest) = s.strip_prefix("www.") {
        s = rest;
    }
    s.trim_end_matches('/').to_string()
}

/// Derive a display name from a domain: strip path, port and known TLD
/// suffixes, turn separators into spaces, title-case every word.
pub fn display_name(domain: &str) -> String {
    let lowered = domain.trim().to_lowercase();
    let host = lowered
        .split('/')
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);

    let mut stem = host;
    'strip: loop {
        for suffix in KNOWN_TLD_SUFFIXES {
            if let Some(rest) = stem.strip_suffix(suffix) {
                if !rest.is_empty() {
                    stem = rest;
                    continue 'strip;
                }
            }
        }
        break;
    }

    stem.split(|c: char| matches!(c, '.' | '-' | '_') || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Reject an empty client profile before a run starts.
pub fn validate_client_profile(profile: &str) -> Result<&str, InputValidationError> {
    let trimmed = profile.trim();
    if trimmed.is_empty() {
        return Err(InputValidationError::EmptyProfile);
    }
    Ok(trimmed)
}
