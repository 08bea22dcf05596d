use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use super::prompt::{build_user_prompt, SYSTEM_PROMPT};
use super::settings::SummarySettings;
use super::wire::{parse_narrative, truncate_body, GenerateRequest};
use super::SummaryError;
use crate::models::MetricWindow;

/// Produces a clinician narrative for a metric window.
///
/// One call is one attempt: implementations never retry on their own.
pub trait NarrativeGenerator: Send + Sync + 'static {
    fn request_narrative(
        &self,
        window: &MetricWindow,
    ) -> impl Future<Output = Result<String, SummaryError>> + Send;
}

// ═══════════════════════════════════════════════════════════
// HttpSummaryClient
// ═══════════════════════════════════════════════════════════

/// HTTPS client for the generateContent endpoint.
pub struct HttpSummaryClient {
    settings: SummarySettings,
    http: reqwest::Client,
}

impl HttpSummaryClient {
    /// Settings are stored as given and validated on every request.
    pub fn new(settings: SummarySettings) -> Result<Self, SummaryError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("vitalbrief/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                SummaryError::Configuration(format!("HTTP client could not be created ({e})"))
            })?;

        Ok(Self { settings, http })
    }

    /// Client configured from `VITALBRIEF_*` environment variables.
    pub fn from_env() -> Result<Self, SummaryError> {
        Self::new(SummarySettings::from_env())
    }

    pub fn settings(&self) -> &SummarySettings {
        &self.settings
    }

    async fn send(&self, window: &MetricWindow) -> Result<String, SummaryError> {
        let resolved = self.settings.resolve()?;
        let timeout_secs = resolved.timeout.as_secs();
        let body = GenerateRequest::new(SYSTEM_PROMPT, &build_user_prompt(window));

        let started = Instant::now();
        let response = self
            .http
            .post(resolved.endpoint.clone())
            .query(&[("key", resolved.api_key.expose())])
            .timeout(resolved.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(e, timeout_secs))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(e, timeout_secs))?;

        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            days = window.len(),
            "Narrative request completed"
        );

        if !status.is_success() {
            return Err(SummaryError::Protocol {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        parse_narrative(&text)
    }
}

impl NarrativeGenerator for HttpSummaryClient {
    async fn request_narrative(&self, window: &MetricWindow) -> Result<String, SummaryError> {
        let result = self.send(window).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Narrative request failed");
        }
        result
    }
}

/// Map a reqwest failure onto the error taxonomy.
/// The URL is stripped first: it carries the API key.
fn classify_transport_error(err: reqwest::Error, timeout_secs: u64) -> SummaryError {
    if err.is_timeout() {
        SummaryError::Timeout(timeout_secs)
    } else if err.is_decode() {
        SummaryError::Decoding(err.without_url().to_string())
    } else {
        SummaryError::Transport(err.without_url().to_string())
    }
}

// ═══════════════════════════════════════════════════════════
// MockNarrativeClient
// ═══════════════════════════════════════════════════════════

/// Mock generator for testing and offline demos: returns a configured result.
///
/// With a gate, each call waits for one permit before answering, which lets
/// tests hold an attempt in flight.
pub struct MockNarrativeClient {
    result: Result<String, SummaryError>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
}

impl MockNarrativeClient {
    pub fn new(narrative: &str) -> Self {
        Self {
            result: Ok(narrative.to_string()),
            delay: None,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: SummaryError) -> Self {
        Self {
            result: Err(error),
            delay: None,
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// How many attempts reached this client.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl NarrativeGenerator for MockNarrativeClient {
    async fn request_narrative(&self, _window: &MetricWindow) -> Result<String, SummaryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            match gate.acquire().await {
                Ok(permit) => permit.forget(),
                Err(_) => return Err(SummaryError::Cancelled),
            }
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}
