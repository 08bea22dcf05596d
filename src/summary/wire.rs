//! generateContent wire format.
//!
//! Decoding is strict: every field on the path to the narrative text is
//! required, so a schema change becomes a named error instead of an empty
//! default.

use serde::{Deserialize, Serialize};

use super::SummaryError;

/// Longest slice of an error body kept in a `Protocol` error.
const MAX_ERROR_BODY_CHARS: usize = 300;

// ──────────────────────────────────────────────
// Request
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

/// Request body: `{"contents": [...], "systemInstruction": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
}

impl GenerateRequest {
    pub fn new(system_prompt: &str, user_prompt: &str) -> Self {
        Self {
            contents: vec![Content::text(user_prompt)],
            system_instruction: Content::text(system_prompt),
        }
    }
}

// ──────────────────────────────────────────────
// Response
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Extract `candidates[0].content.parts[0].text` from a response body.
///
/// Not JSON or wrong shape → `Decoding`; no candidates, no parts, or blank
/// text → `EmptyResult`.
pub fn parse_narrative(body: &str) -> Result<String, SummaryError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| SummaryError::Decoding(e.to_string()))?;

    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content.parts.into_iter().next())
        .map(|p| p.text)
        .ok_or(SummaryError::EmptyResult)?;

    if text.trim().is_empty() {
        return Err(SummaryError::EmptyResult);
    }
    Ok(text)
}

/// Shorten an error body for display, on a char boundary.
pub fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_to_wire_shape() {
        let request = GenerateRequest::new("system text", "user text");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "contents": [{"parts": [{"text": "user text"}]}],
                "systemInstruction": {"parts": [{"text": "system text"}]}
            })
        );
    }

    #[test]
    fn extracts_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Patient stable."}],"role":"model"},"finishReason":"STOP"}]}"#;
        assert_eq!(parse_narrative(body).unwrap(), "Patient stable.");
    }

    #[test]
    fn uses_only_first_part() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"first"},{"text":"second"}]}}]}"#;
        assert_eq!(parse_narrative(body).unwrap(), "first");
    }

    #[test]
    fn empty_candidates_is_empty_result() {
        assert_eq!(
            parse_narrative(r#"{"candidates":[]}"#),
            Err(SummaryError::EmptyResult)
        );
    }

    #[test]
    fn empty_parts_is_empty_result() {
        let body = r#"{"candidates":[{"content":{"parts":[]}}]}"#;
        assert_eq!(parse_narrative(body), Err(SummaryError::EmptyResult));
    }

    #[test]
    fn blank_text_is_empty_result() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#;
        assert_eq!(parse_narrative(body), Err(SummaryError::EmptyResult));
    }

    #[test]
    fn non_json_is_decoding_error() {
        assert!(matches!(
            parse_narrative("<html>Bad Gateway</html>"),
            Err(SummaryError::Decoding(_))
        ));
    }

    #[test]
    fn missing_candidates_is_decoding_error() {
        assert!(matches!(
            parse_narrative(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#),
            Err(SummaryError::Decoding(_))
        ));
    }

    #[test]
    fn missing_content_is_decoding_error() {
        assert!(matches!(
            parse_narrative(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#),
            Err(SummaryError::Decoding(_))
        ));
    }

    #[test]
    fn wrong_text_type_is_decoding_error() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":42}]}}]}"#;
        assert!(matches!(parse_narrative(body), Err(SummaryError::Decoding(_))));
    }

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("  oops \n"), "oops");
        let long = "é".repeat(400);
        let cut = truncate_body(&long);
        assert_eq!(cut.chars().count(), MAX_ERROR_BODY_CHARS + 1);
    }
}
