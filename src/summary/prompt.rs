//! Fixed instructions for the narrative service.

use crate::models::MetricWindow;
use crate::report::format_day_blocks;

/// System instruction sent with every request.
pub const SYSTEM_PROMPT: &str = "You are a medical report assistant preparing a brief for a clinician. \
Summarize the patient's recent wearable metrics as concise bullet points, \
noting trends and anything outside typical ranges. \
Write plain text only: do not use asterisks, pound signs, underscores or any other markdown emphasis. \
Do not begin with conversational filler or a preamble such as \"Sure\" or \"Here is\".";

/// Closing directive appended after the metric lines.
pub const CLOSING_DIRECTIVE: &str = "Respond with the summary bullet points only. \
Start directly with the first point, without any introduction, and use plain text without markdown.";

const USER_PREAMBLE: &str = "Daily metrics, oldest first:\n\n";

/// User instruction: the day blocks from the report followed by the closing directive.
pub fn build_user_prompt(window: &MetricWindow) -> String {
    let days = format_day_blocks(window);
    let mut prompt = String::with_capacity(USER_PREAMBLE.len() + days.len() + CLOSING_DIRECTIVE.len());
    prompt.push_str(USER_PREAMBLE);
    prompt.push_str(&days);
    prompt.push_str(CLOSING_DIRECTIVE);
    prompt
}
