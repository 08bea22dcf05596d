//! Narrative generation: request building, transport, response decoding.

pub mod client;
pub mod prompt;
pub mod settings;
pub mod wire;

pub use client::*;
pub use prompt::*;
pub use settings::*;
pub use wire::*;

use thiserror::Error;

/// Why a narrative attempt failed.
///
/// Messages are complete sentences shown to the user as-is.
/// `Clone` so a failure can be held inside the summary state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummaryError {
    /// Missing or malformed endpoint/credential. Never retried automatically.
    #[error("The summary service is not configured: {0}")]
    Configuration(String),

    #[error("Could not reach the summary service. Check your connection and try again. ({0})")]
    Transport(String),

    #[error("The summary service did not answer within {0} seconds. Try again.")]
    Timeout(u64),

    #[error("The summary service returned an error (HTTP {status}): {body}")]
    Protocol { status: u16, body: String },

    #[error("The summary service sent a response that could not be read: {0}")]
    Decoding(String),

    #[error("The summary service returned no summary text.")]
    EmptyResult,

    #[error("The summary request was cancelled.")]
    Cancelled,
}

impl SummaryError {
    /// Whether asking again without changing anything could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SummaryError::Transport(_)
                | SummaryError::Timeout(_)
                | SummaryError::Protocol { .. }
                | SummaryError::EmptyResult
                | SummaryError::Cancelled
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_are_not_retryable() {
        assert!(!SummaryError::Configuration("missing key".into()).is_retryable());
        assert!(!SummaryError::Decoding("bad".into()).is_retryable());
        assert!(SummaryError::Transport("refused".into()).is_retryable());
        assert!(SummaryError::Timeout(30).is_retryable());
    }

    #[test]
    fn messages_are_user_presentable() {
        let msg = SummaryError::Protocol {
            status: 500,
            body: "internal".into(),
        }
        .to_string();
        assert!(msg.contains("HTTP 500"));
        assert_eq!(
            SummaryError::EmptyResult.to_string(),
            "The summary service returned no summary text."
        );
    }
}
