//! Narrative service configuration.
//!
//! Settings are collected up front (environment or caller) but only
//! validated when a request is made, so a missing key surfaces as a
//! `Configuration` failure on the attempt instead of an empty-key request.

use std::fmt;
use std::time::Duration;

use regex::Regex;
use reqwest::Url;
use zeroize::Zeroizing;

use super::SummaryError;
use crate::config;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API key, zeroed on drop and never printed.
#[derive(Clone)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Zeroizing::new(key.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Raw, unvalidated settings.
#[derive(Debug, Clone)]
pub struct SummarySettings {
    pub endpoint: Option<String>,
    pub api_key: Option<ApiKey>,
    pub timeout_secs: u64,
}

/// Settings that passed validation, ready for one request.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub endpoint: Url,
    pub api_key: ApiKey,
    pub timeout: Duration,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SummarySettings {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            api_key: Some(ApiKey::new(api_key)),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Read settings from the environment.
    ///
    /// Neither the endpoint nor the key has a default; an absent one is
    /// reported by [`resolve`](Self::resolve) as a `Configuration` failure.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from a variable lookup (`VITALBRIEF_*` names).
    /// An unparseable timeout is kept as 0 so validation reports it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let endpoint = lookup(config::ENV_ENDPOINT);
        let api_key = lookup(config::ENV_API_KEY).map(ApiKey::new);

        let timeout_secs = match lookup(config::ENV_TIMEOUT_SECS) {
            Some(raw) => raw.trim().parse().unwrap_or(0),
            None => DEFAULT_TIMEOUT_SECS,
        };

        Self {
            endpoint,
            api_key,
            timeout_secs,
        }
    }

    /// Validate for a single request.
    pub fn resolve(&self) -> Result<ResolvedSettings, SummaryError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| SummaryError::Configuration("no endpoint URL is set".into()))?;
        let endpoint = validate_endpoint(endpoint)?;

        let api_key = self
            .api_key
            .as_ref()
            .filter(|k| !k.expose().trim().is_empty())
            .ok_or_else(|| SummaryError::Configuration("no API key is set".into()))?;
        validate_api_key(api_key.expose())?;

        if self.timeout_secs == 0 {
            return Err(SummaryError::Configuration(
                "the request timeout must be at least one second".into(),
            ));
        }

        Ok(ResolvedSettings {
            endpoint,
            api_key: api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

/// Parse the endpoint and require HTTPS.
///
/// Plain HTTP is only accepted for loopback hosts (local stubs).
/// A query string is rejected: the key is the only query parameter.
pub fn validate_endpoint(raw: &str) -> Result<Url, SummaryError> {
    let url = Url::parse(raw)
        .map_err(|e| SummaryError::Configuration(format!("endpoint URL is malformed ({e})")))?;

    match url.scheme() {
        "https" => {}
        "http" if is_loopback(&url) => {}
        "http" => {
            return Err(SummaryError::Configuration(
                "endpoint URL must use HTTPS".into(),
            ))
        }
        other => {
            return Err(SummaryError::Configuration(format!(
                "endpoint URL scheme '{other}' is not supported"
            )))
        }
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(SummaryError::Configuration("endpoint URL has no host".into()));
    }
    if url.query().is_some() {
        return Err(SummaryError::Configuration(
            "endpoint URL must not carry query parameters".into(),
        ));
    }

    Ok(url)
}

fn is_loopback(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("[::1]")
    )
}

/// Keys are URL-safe tokens: letters, digits, `_` and `-`.
pub fn validate_api_key(key: &str) -> Result<(), SummaryError> {
    let valid = Regex::new(r"^[A-Za-z0-9_-]{8,256}$").map_err(|e| {
        SummaryError::Configuration(format!("internal key pattern error ({e})"))
    })?;
    if !valid.is_match(key) {
        return Err(SummaryError::Configuration(
            "API key contains unexpected characters or has an unexpected length".into(),
        ));
    }
    Ok(())
}
