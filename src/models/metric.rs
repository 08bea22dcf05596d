use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Errors raised when a set of samples does not form a valid window.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WindowError {
    #[error("A metric window needs at least one day of samples")]
    Empty,

    #[error("Samples for {previous} and {next} are not consecutive days")]
    NonConsecutive { previous: NaiveDate, next: NaiveDate },

    #[error("Sample for {date} is invalid: {reason}")]
    InvalidSample { date: NaiveDate, reason: String },

    #[error("A window of {days} days ending {end} falls outside the supported calendar")]
    DateOutOfRange { end: NaiveDate, days: usize },
}

/// One day of wearable-derived metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub date: NaiveDate,
    /// Beats per minute, positive.
    pub resting_heart_rate: f64,
    /// Beats per minute, positive.
    pub sleeping_heart_rate: f64,
    /// Hours, non-negative.
    pub sleep_duration: f64,
    /// Degrees Celsius relative to the personal baseline (0).
    pub wrist_temperature_variance: f64,
}

impl MetricSample {
    fn validate(&self) -> Result<(), WindowError> {
        let reason = if !self.resting_heart_rate.is_finite() || self.resting_heart_rate <= 0.0 {
            Some("resting heart rate must be a positive number")
        } else if !self.sleeping_heart_rate.is_finite() || self.sleeping_heart_rate <= 0.0 {
            Some("sleeping heart rate must be a positive number")
        } else if !self.sleep_duration.is_finite() || self.sleep_duration < 0.0 {
            Some("sleep duration cannot be negative")
        } else if !self.wrist_temperature_variance.is_finite() {
            Some("temperature variance must be a finite number")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(WindowError::InvalidSample {
                date: self.date,
                reason: reason.into(),
            }),
            None => Ok(()),
        }
    }
}

/// Ordered run of daily samples: one per consecutive calendar day, oldest first.
///
/// Only constructible through [`MetricWindow::new`], so every window in the
/// program holds the date invariant. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricWindow {
    samples: Vec<MetricSample>,
}

impl MetricWindow {
    /// Validate and wrap samples. Rejects empty input, gaps, duplicates,
    /// descending dates, and out-of-range readings.
    pub fn new(samples: Vec<MetricSample>) -> Result<Self, WindowError> {
        if samples.is_empty() {
            return Err(WindowError::Empty);
        }

        for sample in &samples {
            sample.validate()?;
        }

        for pair in samples.windows(2) {
            let (previous, next) = (pair[0].date, pair[1].date);
            if previous.succ_opt() != Some(next) {
                return Err(WindowError::NonConsecutive { previous, next });
            }
        }

        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed window; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.samples[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.samples[self.samples.len() - 1].date
    }

    /// Ordered points for one metric, as consumed by the chart view.
    pub fn series(&self, kind: MetricKind) -> Vec<SeriesPoint> {
        self.samples
            .iter()
            .map(|s| SeriesPoint {
                date: s.date,
                value: kind.value_of(s),
            })
            .collect()
    }
}

// ─── Chart projection ─────────────────────────────────────────────────────────

/// The four charted metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    RestingHeartRate,
    SleepingHeartRate,
    SleepDuration,
    WristTemperatureVariance,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::RestingHeartRate,
        MetricKind::SleepingHeartRate,
        MetricKind::SleepDuration,
        MetricKind::WristTemperatureVariance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MetricKind::RestingHeartRate => "Resting HR",
            MetricKind::SleepingHeartRate => "Sleeping HR",
            MetricKind::SleepDuration => "Sleep",
            MetricKind::WristTemperatureVariance => "Temp Variance",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MetricKind::RestingHeartRate | MetricKind::SleepingHeartRate => "BPM",
            MetricKind::SleepDuration => "hours",
            MetricKind::WristTemperatureVariance => "°C",
        }
    }

    pub fn value_of(self, sample: &MetricSample) -> f64 {
        match self {
            MetricKind::RestingHeartRate => sample.resting_heart_rate,
            MetricKind::SleepingHeartRate => sample.sleeping_heart_rate,
            MetricKind::SleepDuration => sample.sleep_duration,
            MetricKind::WristTemperatureVariance => sample.wrist_temperature_variance,
        }
    }
}

/// A single charted value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample(date: NaiveDate) -> MetricSample {
        MetricSample {
            date,
            resting_heart_rate: 85.0,
            sleeping_heart_rate: 50.0,
            sleep_duration: 7.5,
            wrist_temperature_variance: -0.1,
        }
    }

    #[test]
    fn accepts_consecutive_days() {
        let window = MetricWindow::new(vec![sample(day(1)), sample(day(2)), sample(day(3))]).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(window.first_date(), day(1));
        assert_eq!(window.last_date(), day(3));
    }

    #[test]
    fn accepts_month_boundary() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let feb1 = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert!(MetricWindow::new(vec![sample(jan31), sample(feb1)]).is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(MetricWindow::new(vec![]), Err(WindowError::Empty));
    }

    #[test]
    fn rejects_gap() {
        let err = MetricWindow::new(vec![sample(day(1)), sample(day(3))]).unwrap_err();
        assert_eq!(
            err,
            WindowError::NonConsecutive {
                previous: day(1),
                next: day(3)
            }
        );
    }

    #[test]
    fn rejects_duplicate_day() {
        let err = MetricWindow::new(vec![sample(day(1)), sample(day(1))]).unwrap_err();
        assert!(matches!(err, WindowError::NonConsecutive { .. }));
    }

    #[test]
    fn rejects_descending_days() {
        let err = MetricWindow::new(vec![sample(day(2)), sample(day(1))]).unwrap_err();
        assert!(matches!(err, WindowError::NonConsecutive { .. }));
    }

    #[test]
    fn rejects_non_positive_heart_rate() {
        let mut bad = sample(day(1));
        bad.resting_heart_rate = 0.0;
        let err = MetricWindow::new(vec![bad]).unwrap_err();
        assert!(matches!(err, WindowError::InvalidSample { .. }));
    }

    #[test]
    fn rejects_negative_sleep_and_nan() {
        let mut negative = sample(day(1));
        negative.sleep_duration = -1.0;
        assert!(MetricWindow::new(vec![negative]).is_err());

        let mut nan = sample(day(1));
        nan.wrist_temperature_variance = f64::NAN;
        assert!(MetricWindow::new(vec![nan]).is_err());
    }

    #[test]
    fn negative_temperature_variance_is_valid() {
        let mut cold = sample(day(1));
        cold.wrist_temperature_variance = -0.5;
        assert!(MetricWindow::new(vec![cold]).is_ok());
    }

    #[test]
    fn series_follows_window_order() {
        let mut second = sample(day(2));
        second.resting_heart_rate = 91.0;
        let window = MetricWindow::new(vec![sample(day(1)), second]).unwrap();

        let series = window.series(MetricKind::RestingHeartRate);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, day(1));
        assert_eq!(series[0].value, 85.0);
        assert_eq!(series[1].value, 91.0);
    }

    #[test]
    fn metric_kind_units() {
        assert_eq!(MetricKind::RestingHeartRate.unit(), "BPM");
        assert_eq!(MetricKind::SleepDuration.unit(), "hours");
        assert_eq!(MetricKind::WristTemperatureVariance.unit(), "°C");
        assert_eq!(MetricKind::ALL.len(), 4);
    }
}
