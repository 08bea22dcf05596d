//! Plain-text health summary report.
//!
//! One formatter serves two consumers: the on-screen/shareable report and the
//! user prompt sent to the narrative service. Both go through
//! [`format_day_blocks`], so a layout change reaches both at once.
//!
//! Number formatting rounds half away from zero and never depends on locale.

use std::fmt::Write;

use crate::models::{MetricSample, MetricWindow};

pub const REPORT_TITLE: &str = "Health Summary Report";
pub const NARRATIVE_TITLE: &str = "AI-Generated Summary";
const RULE: &str = "---------------------";

// ─── Number formatting ────────────────────────────────────────────────────────

/// Round half away from zero to `decimals` places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // -0.004 must not render as "-0.00"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Heart rate, whole beats: 86.7 → "87".
pub fn format_heart_rate(bpm: f64) -> String {
    format!("{:.0}", round_to(bpm, 0))
}

/// Sleep hours, one decimal: 7.25 → "7.3".
pub fn format_sleep_hours(hours: f64) -> String {
    format!("{:.1}", round_to(hours, 1))
}

/// Signed temperature deviation, two decimals: 0.3 → "+0.30", -0.07 → "-0.07".
pub fn format_temperature_variance(celsius: f64) -> String {
    format!("{:+.2}", round_to(celsius, 2))
}

// ─── Blocks ───────────────────────────────────────────────────────────────────

/// One day: heading plus the four metric lines, followed by a blank line.
pub fn format_day_block(sample: &MetricSample) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}:", sample.date.format("%A, %b %-d"));
    let _ = writeln!(
        out,
        "  - Resting HR: {} BPM",
        format_heart_rate(sample.resting_heart_rate)
    );
    let _ = writeln!(
        out,
        "  - Sleeping HR: {} BPM",
        format_heart_rate(sample.sleeping_heart_rate)
    );
    let _ = writeln!(out, "  - Sleep: {} hours", format_sleep_hours(sample.sleep_duration));
    let _ = writeln!(
        out,
        "  - Temp Variance: {}°C",
        format_temperature_variance(sample.wrist_temperature_variance)
    );
    out.push('\n');
    out
}

/// Every day block in window order, without the report header.
pub fn format_day_blocks(window: &MetricWindow) -> String {
    window.samples().iter().map(format_day_block).collect()
}

/// Full report. The narrative section is left out when `narrative` is
/// `None` or blank.
pub fn format_report(window: &MetricWindow, narrative: Option<&str>) -> String {
    let mut out = String::with_capacity(64 + window.len() * 128);
    out.push_str(REPORT_TITLE);
    out.push('\n');
    out.push_str(RULE);
    out.push_str("\n\n");
    out.push_str(&format_day_blocks(window));

    if let Some(text) = narrative.filter(|t| !t.trim().is_empty()) {
        out.push_str(NARRATIVE_TITLE);
        out.push('\n');
        out.push_str(RULE);
        out.push('\n');
        out.push_str(text);
    }

    out
}

// ─── Tests ────────────────────────────────────────────────────────────────────
