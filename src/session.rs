//! One report session: a fixed metric window plus the narrative lifecycle.
//!
//! The session owns the only [`SummaryMachine`]. `request_summary` returns
//! as soon as the attempt is spawned; the spawned task feeds its result back
//! through the machine, which drops it if the attempt has been superseded.
//! Ending (or dropping) the session aborts any attempt still in flight.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::metrics_source::MetricsSource;
use crate::models::{MetricWindow, WindowError};
use crate::report;
use crate::share::{self, EncodeError, RasterImage};
use crate::summary::NarrativeGenerator;
use crate::summary_state::{SummaryMachine, SummaryState};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Metric window unavailable: {0}")]
    Window(#[from] WindowError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// What happened to a summary request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A new attempt is in flight.
    Started { generation: u64 },
    /// An attempt was already loading; nothing was sent.
    AlreadyInFlight,
}

// ═══════════════════════════════════════════════════════════
// ReportSession
// ═══════════════════════════════════════════════════════════

pub struct ReportSession<G: NarrativeGenerator> {
    id: Uuid,
    window: Arc<MetricWindow>,
    generator: Arc<G>,
    machine: Arc<Mutex<SummaryMachine>>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl<G: NarrativeGenerator> ReportSession<G> {
    /// Start a session over an existing window. Summary state begins Idle.
    pub fn new(window: MetricWindow, generator: G) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session_id = %id, days = window.len(), "Report session started");
        Self {
            id,
            window: Arc::new(window),
            generator: Arc::new(generator),
            machine: Arc::new(Mutex::new(SummaryMachine::new())),
            in_flight: Mutex::new(None),
        }
    }

    /// Start a session with a fresh window from `source`.
    pub fn from_source(
        source: &dyn MetricsSource,
        days: usize,
        end_date: NaiveDate,
        generator: G,
    ) -> Result<Self, SessionError> {
        let window = source.window(days, end_date)?;
        Ok(Self::new(window, generator))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn window(&self) -> &MetricWindow {
        &self.window
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Snapshot of the summary state.
    pub fn state(&self) -> Result<SummaryState, SessionError> {
        let machine = self.machine.lock().map_err(|_| SessionError::LockPoisoned)?;
        Ok(machine.state())
    }

    /// Read-only projection of the summary state for views.
    pub fn subscribe(&self) -> Result<watch::Receiver<SummaryState>, SessionError> {
        let machine = self.machine.lock().map_err(|_| SessionError::LockPoisoned)?;
        Ok(machine.subscribe())
    }

    /// Request a narrative. Must be called from within a tokio runtime.
    ///
    /// Ignored while an attempt is loading; otherwise the previous result is
    /// dropped, the state moves to Loading and the call is spawned.
    pub fn request_summary(&self) -> Result<RequestOutcome, SessionError> {
        // Held until the handle is stored so `cancel` cannot slip in between
        // `begin` and the spawn. Lock order: in_flight, then machine.
        let mut in_flight = self.in_flight.lock().map_err(|_| SessionError::LockPoisoned)?;

        let ticket = {
            let mut machine = self.machine.lock().map_err(|_| SessionError::LockPoisoned)?;
            match machine.begin() {
                Some(ticket) => ticket,
                None => return Ok(RequestOutcome::AlreadyInFlight),
            }
        };

        let window = Arc::clone(&self.window);
        let generator = Arc::clone(&self.generator);
        let machine = Arc::clone(&self.machine);
        let session_id = self.id;

        let handle = tokio::spawn(async move {
            let result = generator.request_narrative(&window).await;
            match machine.lock() {
                Ok(mut machine) => {
                    if machine.complete(ticket, result) {
                        tracing::info!(
                            session_id = %session_id,
                            generation = ticket.generation(),
                            status = ?machine.state().status(),
                            "Summary attempt recorded"
                        );
                    }
                }
                Err(_) => {
                    tracing::error!(session_id = %session_id, "Summary state lock poisoned, result dropped");
                }
            }
        });

        *in_flight = Some(handle.abort_handle());

        Ok(RequestOutcome::Started {
            generation: ticket.generation(),
        })
    }

    /// Cancel the in-flight attempt, if any. The state becomes
    /// `Failed(Cancelled)` and a new request is allowed.
    pub fn cancel(&self) -> Result<bool, SessionError> {
        let mut in_flight = self.in_flight.lock().map_err(|_| SessionError::LockPoisoned)?;
        if let Some(handle) = in_flight.take() {
            handle.abort();
        }
        let mut machine = self.machine.lock().map_err(|_| SessionError::LockPoisoned)?;
        let cancelled = machine.cancel();
        if cancelled {
            tracing::info!(session_id = %self.id, "Summary attempt cancelled");
        }
        Ok(cancelled)
    }

    /// Wait until no attempt is loading and return the settled state.
    pub async fn settled(&self) -> Result<SummaryState, SessionError> {
        let mut rx = self.subscribe()?;
        let state = rx
            .wait_for(|state| !state.is_loading())
            .await
            .map(|state| state.clone());
        match state {
            Ok(state) => Ok(state),
            // Sender lives in the session, so this only happens during teardown.
            Err(_) => self.state(),
        }
    }

    /// The shareable report: metrics plus the narrative when Ready.
    /// Derived from current inputs on every call.
    pub fn report_text(&self) -> Result<String, SessionError> {
        let state = self.state()?;
        Ok(report::format_report(&self.window, state.narrative()))
    }

    /// QR code for the current report.
    ///
    /// `SessionError::Encode` is the share fallback case (too large to
    /// encode): the caller shows a placeholder and keeps the text on screen.
    pub fn share_code(&self) -> Result<RasterImage, SessionError> {
        let text = self.report_text()?;
        share::encode(&text).map_err(|e| {
            tracing::warn!(session_id = %self.id, error = %e, "Share code unavailable");
            SessionError::Encode(e)
        })
    }

    /// End the session, aborting any in-flight attempt.
    pub fn end(self) {
        // Drop does the work.
    }
}

impl<G: NarrativeGenerator> Drop for ReportSession<G> {
    fn drop(&mut self) {
        let aborted = match self.in_flight.get_mut() {
            Ok(slot) => slot.take().map(|h| h.abort()).is_some(),
            Err(poisoned) => poisoned.into_inner().take().map(|h| h.abort()).is_some(),
        };
        tracing::info!(session_id = %self.id, aborted_in_flight = aborted, "Report session ended");
    }
}
