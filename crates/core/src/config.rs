//! Configuration structures for the power position extract.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default report folder, relative to the working directory.
pub const DEFAULT_OUTPUT_FOLDER: &str = "reports";

/// Default extract interval in minutes.
pub const DEFAULT_INTERVAL_MINUTES: u32 = 15;

/// Resolved service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Existing directory receiving report files.
    pub output_folder: PathBuf,
    /// Minutes between tick starts. Always > 0.
    pub interval_minutes: u32,
}

impl Settings {
    /// Create settings.
    pub fn new(output_folder: impl Into<PathBuf>, interval_minutes: u32) -> Self {
        Self {
            output_folder: output_folder.into(),
            interval_minutes,
        }
    }

    /// Interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }
}

/// What to do with a period whose index falls outside 1..=24.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeriodIndexPolicy {
    /// Drop the period and report it; the tick still writes a file.
    #[default]
    Skip,
    /// Fail the tick with a data integrity error.
    Reject,
}

/// How fractional volumes are rounded in the report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingPolicy {
    /// Ties go to the even neighbour (12.5 -> 12, 13.5 -> 14).
    #[default]
    HalfEven,
    /// Ties go away from zero (12.5 -> 13, -12.5 -> -13).
    HalfAwayFromZero,
}

impl RoundingPolicy {
    /// Round a volume to a whole number.
    pub fn round(self, value: f64) -> i64 {
        let rounded = match self {
            RoundingPolicy::HalfEven => value.round_ties_even(),
            RoundingPolicy::HalfAwayFromZero => value.round(),
        };
        // Saturating cast; also folds -0.0 into 0.
        rounded as i64
    }
}

/// Delay schedule between fetch attempts.
///
/// Attempts are never limited in number; only the pause between them is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Pause after the first failure. Zero retries immediately.
    pub initial_backoff: Duration,
    /// Upper bound for the pause.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Retry straight away after every failure.
    pub fn immediate() -> Self {
        Self {
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Pause after the given number of consecutive failures (1-based).
    pub fn backoff(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_values() {
        assert_eq!(DEFAULT_INTERVAL_MINUTES, 15);
        assert_eq!(DEFAULT_OUTPUT_FOLDER, "reports");
        assert_eq!(PeriodIndexPolicy::default(), PeriodIndexPolicy::Skip);
        assert_eq!(RoundingPolicy::default(), RoundingPolicy::HalfEven);
    }

    #[test]
    fn test_settings_interval() {
        let settings = Settings::new("out", 15);
        assert_eq!(settings.interval(), Duration::from_secs(900));
    }

    #[test]
    fn test_rounding_half_even() {
        let policy = RoundingPolicy::HalfEven;
        assert_eq!(policy.round(12.4), 12);
        assert_eq!(policy.round(12.5), 12);
        assert_eq!(policy.round(13.5), 14);
        assert_eq!(policy.round(12.6), 13);
        assert_eq!(policy.round(-2.5), -2);
        assert_eq!(policy.round(-0.4), 0);
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let policy = RoundingPolicy::HalfAwayFromZero;
        assert_eq!(policy.round(12.5), 13);
        assert_eq!(policy.round(13.5), 14);
        assert_eq!(policy.round(-2.5), -3);
    }

    #[test]
    fn test_retry_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(1000), Duration::from_millis(500));
    }

    #[test]
    fn test_immediate_retry() {
        let policy = RetryPolicy::immediate();
        assert_eq!(policy.backoff(1), Duration::ZERO);
        assert_eq!(policy.backoff(50), Duration::ZERO);
    }
}
