//! Core units, constants, and shared primitives for the astrochop workspace.

/// Physical constants (km, s, days unless stated otherwise).
pub mod constants {
    /// Heliocentric gravitational parameter (km³/s²).
    pub const MU_SUN: f64 = 1.327_124_400_18e11;
    /// Kilometres per astronomical unit.
    pub const AU_KM: f64 = 149_597_870.7;
    /// Seconds per Julian day.
    pub const SECONDS_PER_DAY: f64 = 86_400.0;
    /// Julian Date of the J2000 reference epoch.
    pub const J2000_JD: f64 = 2_451_545.0;
    /// Julian Date of the Unix epoch (1970-01-01T00:00:00).
    pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;
}

/// Lightweight time utilities shared across crates.
pub mod time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};

    use super::constants::{SECONDS_PER_DAY, UNIX_EPOCH_JD};

    /// Convert days to seconds.
    #[inline]
    pub fn days_to_seconds(days: f64) -> f64 {
        days * SECONDS_PER_DAY
    }

    /// Convert seconds to days.
    #[inline]
    pub fn seconds_to_days(seconds: f64) -> f64 {
        seconds / SECONDS_PER_DAY
    }

    /// Julian Date of a calendar instant (proleptic Gregorian, no leap seconds).
    pub fn julian_date(datetime: &NaiveDateTime) -> f64 {
        let utc = datetime.and_utc();
        let seconds = utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) * 1e-9;
        UNIX_EPOCH_JD + seconds / SECONDS_PER_DAY
    }

    /// Julian Date at midnight of a calendar day.
    pub fn julian_date_of_day(date: &NaiveDate) -> f64 {
        julian_date(&date.and_time(chrono::NaiveTime::MIN))
    }

    /// Calendar instant for a Julian Date, rounded to the nearest millisecond.
    ///
    /// Returns `None` when the date falls outside chrono's representable range.
    pub fn calendar_from_julian(jd: f64) -> Option<NaiveDateTime> {
        if !jd.is_finite() {
            return None;
        }
        let millis = ((jd - UNIX_EPOCH_JD) * SECONDS_PER_DAY * 1_000.0).round();
        if millis.abs() > i64::MAX as f64 {
            return None;
        }
        DateTime::from_timestamp_millis(millis as i64).map(|dt| dt.naive_utc())
    }

    /// `YYYY-MM-DD` label for a Julian Date, falling back to the raw number.
    pub fn format_julian_date(jd: f64) -> String {
        match calendar_from_julian(jd) {
            Some(dt) => dt.format("%Y-%m-%d").to_string(),
            None => format!("{jd:.3}"),
        }
    }

    /// Parse `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS` into a Julian Date.
    pub fn parse_julian_date(text: &str) -> Option<f64> {
        let trimmed = text.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
            return Some(julian_date(&dt));
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .map(|date| julian_date_of_day(&date))
    }
}

/// Minimal vector helpers to avoid ad-hoc `[f64; 3]` math everywhere.
pub mod vector {
    /// Alias for a 3D vector in kilometres or km/s depending on context.
    pub type Vector3 = [f64; 3];

    /// Euclidean norm of a vector.
    #[inline]
    pub fn norm(v: &Vector3) -> f64 {
        dot(v, v).sqrt()
    }

    /// Dot product of two vectors.
    #[inline]
    pub fn dot(a: &Vector3, b: &Vector3) -> f64 {
        a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
    }

    /// Cross product `a × b`.
    #[inline]
    pub fn cross(a: &Vector3, b: &Vector3) -> Vector3 {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    }

    /// Vector addition.
    #[inline]
    pub fn add(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
    }

    /// Vector subtraction.
    #[inline]
    pub fn sub(a: &Vector3, b: &Vector3) -> Vector3 {
        [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
    }

    /// Scale a vector by a scalar.
    #[inline]
    pub fn scale(v: &Vector3, s: f64) -> Vector3 {
        [v[0] * s, v[1] * s, v[2] * s]
    }
}

#[cfg(test)]
mod tests {
    use super::constants::J2000_JD;
    use super::time::{calendar_from_julian, format_julian_date, parse_julian_date};
    use chrono::NaiveDate;

    #[test]
    fn j2000_noon_round_trips() {
        let jd = parse_julian_date("2000-01-01T12:00:00").unwrap();
        assert!((jd - J2000_JD).abs() < 1e-9);
        let dt = calendar_from_julian(jd).unwrap();
        assert_eq!(
            dt,
            NaiveDate::from_ymd_opt(2000, 1, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn date_only_parses_at_midnight() {
        let jd = parse_julian_date("2005-04-01").unwrap();
        assert!((jd - 2_453_461.5).abs() < 1e-9);
        assert_eq!(format_julian_date(jd), "2005-04-01");
        assert!(parse_julian_date("not a date").is_none());
    }
}
