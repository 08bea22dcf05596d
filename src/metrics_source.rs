//! Metric window producers.
//!
//! The summary screen only sees a [`MetricWindow`]; where the samples come
//! from is hidden behind [`MetricsSource`]. The synthetic source stands in
//! for a wearable feed until real device integration lands.

use std::ops::RangeInclusive;
use std::sync::Mutex;

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{MetricSample, MetricWindow, WindowError};

/// Resting heart rate range (BPM).
pub const RESTING_HR_RANGE: RangeInclusive<f64> = 80.0..=100.0;
/// Sleeping heart rate range (BPM).
pub const SLEEPING_HR_RANGE: RangeInclusive<f64> = 48.0..=54.0;
/// Sleep duration range (hours).
pub const SLEEP_HOURS_RANGE: RangeInclusive<f64> = 6.5..=8.5;
/// Wrist temperature deviation from baseline (°C).
pub const TEMP_VARIANCE_RANGE: RangeInclusive<f64> = -0.5..=0.5;

/// Anything that can produce the window for a session.
pub trait MetricsSource: Send + Sync {
    /// `size` consecutive days ending at `end_date`, oldest first.
    fn window(&self, size: usize, end_date: NaiveDate) -> Result<MetricWindow, WindowError>;
}

/// Dates for `size` consecutive days ending at `end_date`, oldest first.
pub fn window_dates(size: usize, end_date: NaiveDate) -> Result<Vec<NaiveDate>, WindowError> {
    if size == 0 {
        return Err(WindowError::Empty);
    }
    let start = end_date
        .checked_sub_days(Days::new(size as u64 - 1))
        .ok_or(WindowError::DateOutOfRange {
            end: end_date,
            days: size,
        })?;
    Ok(start.iter_days().take(size).collect())
}

// ═══════════════════════════════════════════════════════════
// SyntheticMetricsSource
// ═══════════════════════════════════════════════════════════

/// Uniformly random samples within fixed physiological ranges.
pub struct SyntheticMetricsSource {
    rng: Mutex<StdRng>,
}

impl SyntheticMetricsSource {
    /// Entropy-seeded source (a fresh week every session).
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible source for demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn draw(rng: &mut StdRng, date: NaiveDate) -> MetricSample {
        MetricSample {
            date,
            resting_heart_rate: rng.gen_range(RESTING_HR_RANGE),
            sleeping_heart_rate: rng.gen_range(SLEEPING_HR_RANGE),
            sleep_duration: rng.gen_range(SLEEP_HOURS_RANGE),
            wrist_temperature_variance: rng.gen_range(TEMP_VARIANCE_RANGE),
        }
    }
}

impl Default for SyntheticMetricsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsSource for SyntheticMetricsSource {
    fn window(&self, size: usize, end_date: NaiveDate) -> Result<MetricWindow, WindowError> {
        let dates = window_dates(size, end_date)?;
        // A poisoned lock only means another thread panicked mid-draw; the RNG state is still usable.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let samples = dates
            .into_iter()
            .map(|date| Self::draw(&mut rng, date))
            .collect();

        let window = MetricWindow::new(samples)?;
        tracing::debug!(days = size, end = %end_date, "Generated synthetic metric window");
        Ok(window)
    }
}

// ═══════════════════════════════════════════════════════════
// FixedMetricsSource
// ═══════════════════════════════════════════════════════════

/// Replays a fixed reading set, re-dated onto the requested days.
///
/// Readings are used in order; the list cycles when the window is longer
/// than the readings.
pub struct FixedMetricsSource {
    readings: Vec<MetricSample>,
}

impl FixedMetricsSource {
    pub fn new(readings: Vec<MetricSample>) -> Self {
        Self { readings }
    }
}

impl MetricsSource for FixedMetricsSource {
    fn window(&self, size: usize, end_date: NaiveDate) -> Result<MetricWindow, WindowError> {
        if self.readings.is_empty() {
            return Err(WindowError::Empty);
        }
        let dates = window_dates(size, end_date)?;
        let samples = dates
            .into_iter()
            .zip(self.readings.iter().cycle())
            .map(|(date, reading)| MetricSample { date, ..*reading })
            .collect();
        MetricWindow::new(samples)
    }
}
