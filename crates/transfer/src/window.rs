use astrochop_core::time::parse_julian_date;
use thiserror::Error;

/// Slack for floating-point drift when deciding whether `end_jd` is sampled.
const END_TOLERANCE_DAYS: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum WindowError {
    #[error("window step must be positive, got {0} days")]
    NonPositiveStep(f64),
    #[error("window bounds must be finite")]
    NonFinite,
    #[error("window ends before it starts ({start_jd} > {end_jd})")]
    Reversed { start_jd: f64, end_jd: f64 },
    #[error("unrecognised date `{0}` (expected YYYY-MM-DD)")]
    InvalidDate(String),
}

/// Evenly spaced epochs from `start_jd` to `end_jd` inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start_jd: f64,
    pub end_jd: f64,
    pub step_days: f64,
}

impl TimeWindow {
    pub fn new(start_jd: f64, end_jd: f64, step_days: f64) -> Result<Self, WindowError> {
        if !(start_jd.is_finite() && end_jd.is_finite() && step_days.is_finite()) {
            return Err(WindowError::NonFinite);
        }
        if step_days <= 0.0 {
            return Err(WindowError::NonPositiveStep(step_days));
        }
        if end_jd < start_jd {
            return Err(WindowError::Reversed { start_jd, end_jd });
        }
        Ok(Self {
            start_jd,
            end_jd,
            step_days,
        })
    }

    /// Window between two calendar dates (`YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`).
    pub fn from_dates(start: &str, end: &str, step_days: f64) -> Result<Self, WindowError> {
        let parse = |text: &str| {
            parse_julian_date(text).ok_or_else(|| WindowError::InvalidDate(text.to_string()))
        };
        Self::new(parse(start)?, parse(end)?, step_days)
    }

    /// Number of samples, computed without materialising the axis.
    pub fn len(&self) -> usize {
        if !(self.step_days > 0.0) || self.end_jd < self.start_jd {
            return 0;
        }
        let steps = ((self.end_jd - self.start_jd + END_TOLERANCE_DAYS) / self.step_days).floor();
        if steps >= usize::MAX as f64 {
            usize::MAX
        } else {
            steps as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The sampled epochs. Each is `start + k·step`, so rounding does not accumulate.
    pub fn epochs(&self) -> Vec<f64> {
        (0..self.len())
            .map(|k| self.start_jd + k as f64 * self.step_days)
            .collect()
    }
}
