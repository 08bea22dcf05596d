//! Summary lifecycle state machine.
//!
//! ```text
//! Idle ──request──▶ Loading ──success──▶ Ready(text)
//!                      │  └────failure──▶ Failed(err)
//! Ready / Failed ──request──▶ Loading
//! ```
//!
//! Single-flight: `begin` while Loading is a no-op. Every attempt carries a
//! generation number; a completion whose generation is not the current one
//! is discarded, so a stale response can never overwrite a newer attempt.
//!
//! The current state is published on a `watch` channel; consumers get a
//! read-only receiver and never mutate it.

use serde::Serialize;
use tokio::sync::watch;

use crate::summary::SummaryError;

/// Where the narrative for this session stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SummaryState {
    #[default]
    Idle,
    Loading,
    Ready(String),
    Failed(SummaryError),
}

impl SummaryState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SummaryState::Loading)
    }

    /// Narrative text, only when Ready.
    pub fn narrative(&self) -> Option<&str> {
        match self {
            SummaryState::Ready(text) => Some(text),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SummaryError> {
        match self {
            SummaryState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn status(&self) -> SummaryStatus {
        match self {
            SummaryState::Idle => SummaryStatus::Idle,
            SummaryState::Loading => SummaryStatus::Loading,
            SummaryState::Ready(_) => SummaryStatus::Ready,
            SummaryState::Failed(_) => SummaryStatus::Failed,
        }
    }

    /// Flat, serializable projection for display.
    pub fn view(&self) -> SummaryView {
        SummaryView {
            status: self.status(),
            narrative: self.narrative().map(str::to_string),
            error: self.error().map(ToString::to_string),
            retryable: self.error().map(SummaryError::is_retryable),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// What the summary panel renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryView {
    pub status: SummaryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

/// Proof that an attempt was started; required to complete it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTicket {
    generation: u64,
}

impl AttemptTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

// ═══════════════════════════════════════════════════════════
// SummaryMachine
// ═══════════════════════════════════════════════════════════

/// Owns the state and the only code paths allowed to change it.
pub struct SummaryMachine {
    tx: watch::Sender<SummaryState>,
    generation: u64,
}

impl SummaryMachine {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SummaryState::Idle);
        Self { tx, generation: 0 }
    }

    /// Current state (owned copy).
    pub fn state(&self) -> SummaryState {
        self.tx.borrow().clone()
    }

    /// Read-only projection for consumers.
    pub fn subscribe(&self) -> watch::Receiver<SummaryState> {
        self.tx.subscribe()
    }

    /// Generation of the latest attempt (0 before the first).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `request` transition. Returns `None` when an attempt is already in
    /// flight; the call is then ignored entirely.
    pub fn begin(&mut self) -> Option<AttemptTicket> {
        if self.tx.borrow().is_loading() {
            tracing::debug!(generation = self.generation, "Summary already loading, request ignored");
            return None;
        }
        self.generation += 1;
        self.tx.send_replace(SummaryState::Loading);
        tracing::debug!(generation = self.generation, "Summary attempt started");
        Some(AttemptTicket {
            generation: self.generation,
        })
    }

    /// Apply an attempt's outcome. Returns `false` (and changes nothing) when
    /// the ticket is stale or no attempt is loading.
    pub fn complete(&mut self, ticket: AttemptTicket, result: Result<String, SummaryError>) -> bool {
        if ticket.generation != self.generation || !self.tx.borrow().is_loading() {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale summary result"
            );
            return false;
        }

        // Ready always carries text, whichever generator produced it.
        let next = match result {
            Ok(text) if text.trim().is_empty() => SummaryState::Failed(SummaryError::EmptyResult),
            Ok(text) => SummaryState::Ready(text),
            Err(err) => SummaryState::Failed(err),
        };
        tracing::debug!(generation = self.generation, status = ?next.status(), "Summary attempt settled");
        self.tx.send_replace(next);
        true
    }

    /// Abandon the in-flight attempt: the state becomes `Failed(Cancelled)`,
    /// which no longer accepts its ticket. No-op unless Loading.
    pub fn cancel(&mut self) -> bool {
        if !self.tx.borrow().is_loading() {
            return false;
        }
        self.tx.send_replace(SummaryState::Failed(SummaryError::Cancelled));
        true
    }
}

impl Default for SummaryMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn starts_idle() {
        let machine = SummaryMachine::new();
        assert_eq!(machine.state(), SummaryState::Idle);
        assert_eq!(machine.generation(), 0);
    }

    #[test]
    fn request_then_success_is_ready() {
        let mut machine = SummaryMachine::new();
        let ticket = machine.begin().unwrap();
        assert!(machine.state().is_loading());

        assert!(machine.complete(ticket, Ok("Patient stable.".into())));
        assert_eq!(machine.state(), SummaryState::Ready("Patient stable.".into()));
        assert_eq!(machine.state().narrative(), Some("Patient stable."));
    }

    #[test]
    fn request_then_failure_is_failed() {
        let mut machine = SummaryMachine::new();
        let ticket = machine.begin().unwrap();
        machine.complete(ticket, Err(SummaryError::EmptyResult));
        assert_eq!(machine.state(), SummaryState::Failed(SummaryError::EmptyResult));
    }

    #[test]
    fn blank_success_text_is_empty_result() {
        let mut machine = SummaryMachine::new();
        let ticket = machine.begin().unwrap();
        assert!(machine.complete(ticket, Ok(String::new())));
        assert_eq!(machine.state(), SummaryState::Failed(SummaryError::EmptyResult));

        let ticket = machine.begin().unwrap();
        machine.complete(ticket, Ok(" \n\t".into()));
        assert_eq!(machine.state(), SummaryState::Failed(SummaryError::EmptyResult));
        assert_eq!(machine.state().narrative(), None);
    }

    #[test]
    fn request_while_loading_is_ignored() {
        let mut machine = SummaryMachine::new();
        let first = machine.begin().unwrap();
        assert!(machine.begin().is_none());
        assert_eq!(machine.generation(), first.generation());
    }

    #[test]
    fn new_request_discards_previous_payload() {
        let mut machine = SummaryMachine::new();
        let ticket = machine.begin().unwrap();
        machine.complete(ticket, Ok("old".into()));

        machine.begin().unwrap();
        assert_eq!(machine.state(), SummaryState::Loading);
        assert_eq!(machine.state().narrative(), None);
    }

    #[test]
    fn retry_allowed_after_failure() {
        let mut machine = SummaryMachine::new();
        let t1 = machine.begin().unwrap();
        machine.complete(t1, Err(SummaryError::Timeout(30)));
        let t2 = machine.begin().unwrap();
        assert!(machine.complete(t2, Ok("second try".into())));
        assert_eq!(machine.state().narrative(), Some("second try"));
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut machine = SummaryMachine::new();
        let stale = machine.begin().unwrap();
        machine.cancel();
        let current = machine.begin().unwrap();

        assert!(!machine.complete(stale, Ok("stale".into())));
        assert!(machine.state().is_loading());
        assert!(machine.complete(current, Ok("fresh".into())));
        assert_eq!(machine.state().narrative(), Some("fresh"));
    }

    #[test]
    fn completing_twice_is_rejected() {
        let mut machine = SummaryMachine::new();
        let ticket = machine.begin().unwrap();
        assert!(machine.complete(ticket, Ok("first".into())));
        assert!(!machine.complete(ticket, Ok("second".into())));
        assert_eq!(machine.state().narrative(), Some("first"));
    }

    #[test]
    fn cancel_only_applies_while_loading() {
        let mut machine = SummaryMachine::new();
        assert!(!machine.cancel());
        machine.begin().unwrap();
        assert!(machine.cancel());
        assert_eq!(machine.state(), SummaryState::Failed(SummaryError::Cancelled));
    }

    #[test]
    fn subscribers_see_transitions() {
        let mut machine = SummaryMachine::new();
        let rx = machine.subscribe();
        let ticket = machine.begin().unwrap();
        assert!(rx.borrow().is_loading());
        machine.complete(ticket, Ok("done".into()));
        assert_eq!(rx.borrow().narrative(), Some("done"));
    }

    #[test]
    fn view_serializes_status_and_error() {
        let failed = SummaryState::Failed(SummaryError::Timeout(30)).view();
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["retryable"], true);
        assert!(json.get("narrative").is_none());

        let idle = serde_json::to_value(SummaryState::Idle.view()).unwrap();
        assert_eq!(idle, serde_json::json!({"status": "idle"}));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Request,
        Succeed(usize),
        Fail(usize),
        Cancel,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Request),
            2 => (0usize..4).prop_map(Op::Succeed),
            2 => (0usize..4).prop_map(Op::Fail),
            1 => Just(Op::Cancel),
        ]
    }

    proptest! {
        // Succeed/Fail pick any ticket handed out so far, stale ones included.
        #[test]
        fn never_two_loading_entries_in_a_row(ops in prop::collection::vec(op(), 1..60)) {
            let mut machine = SummaryMachine::new();
            let mut tickets: Vec<AttemptTicket> = Vec::new();
            let mut entries: Vec<SummaryStatus> = Vec::new();

            for op in ops {
                match op {
                    Op::Request => {
                        let was_loading = machine.state().is_loading();
                        match machine.begin() {
                            Some(ticket) => {
                                prop_assert!(!was_loading);
                                tickets.push(ticket);
                                entries.push(SummaryStatus::Loading);
                            }
                            None => prop_assert!(was_loading),
                        }
                    }
                    Op::Succeed(_) | Op::Fail(_) if tickets.is_empty() => {}
                    Op::Succeed(i) => {
                        let ticket = tickets[tickets.len() - 1 - i % tickets.len()];
                        if machine.complete(ticket, Ok("ok".into())) {
                            entries.push(SummaryStatus::Ready);
                        }
                    }
                    Op::Fail(i) => {
                        let ticket = tickets[tickets.len() - 1 - i % tickets.len()];
                        if machine.complete(ticket, Err(SummaryError::EmptyResult)) {
                            entries.push(SummaryStatus::Failed);
                        }
                    }
                    Op::Cancel => {
                        if machine.cancel() {
                            entries.push(SummaryStatus::Failed);
                        }
                    }
                }
            }

            for pair in entries.windows(2) {
                prop_assert!(
                    !(pair[0] == SummaryStatus::Loading && pair[1] == SummaryStatus::Loading)
                );
            }
            prop_assert_eq!(machine.state().status(), *entries.last().unwrap_or(&SummaryStatus::Idle));
        }
    }
}
