//! Elapsed-time arithmetic shared by reconstruction, aggregation and reports.
//!
//! All spans are [`TimeDelta`] values: signed, microsecond-exact, and safe to
//! add together (summing timestamps is not, summing elapsed time is).

use chrono::{DateTime, TimeDelta, Utc};

/// Errors from duration arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DurationError {
    /// Mean requested over an empty collection.
    #[error("cannot compute the mean of an empty duration collection")]
    EmptyInput,

    /// The running sum (or the divisor) left the representable range.
    #[error("duration arithmetic overflowed")]
    Overflow,
}

/// Elapsed time from `start` to `end`.
///
/// A negative result (end before start) is returned as-is.
#[must_use]
pub fn elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> TimeDelta {
    end.signed_duration_since(start)
}

/// Arithmetic mean of a set of durations.
///
/// # Errors
///
/// [`DurationError::EmptyInput`] when `durations` is empty and
/// [`DurationError::Overflow`] when the sum cannot be represented.
pub fn mean(durations: &[TimeDelta]) -> Result<TimeDelta, DurationError> {
    if durations.is_empty() {
        return Err(DurationError::EmptyInput);
    }

    let total = durations
        .iter()
        .try_fold(TimeDelta::zero(), |acc, d| acc.checked_add(d))
        .ok_or(DurationError::Overflow)?;
    let count = i32::try_from(durations.len()).map_err(|_| DurationError::Overflow)?;

    Ok(total / count)
}

/// Duration in fractional seconds, for machine-readable output.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn as_seconds_f64(duration: TimeDelta) -> f64 {
    let micros = duration.num_microseconds().unwrap_or_else(|| {
        if duration < TimeDelta::zero() {
            i64::MIN
        } else {
            i64::MAX
        }
    });
    micros as f64 / 1_000_000.0
}

/// Render a duration as `"N days, H:MM:SS[.ffffff]"`.
///
/// The day part is omitted when zero; negative spans get a leading `-`.
#[must_use]
pub fn format_elapsed(duration: TimeDelta) -> String {
    let negative = duration < TimeDelta::zero();
    let magnitude = duration.abs();

    let days = magnitude.num_days();
    let secs_of_day = magnitude.num_seconds() - days * 86_400;
    let hours = secs_of_day / 3_600;
    let minutes = (secs_of_day % 3_600) / 60;
    let seconds = secs_of_day % 60;
    let micros = magnitude.subsec_nanos() / 1_000;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    match days {
        0 => {}
        1 => out.push_str("1 day, "),
        n => out.push_str(&format!("{n} days, ")),
    }
    out.push_str(&format!("{hours}:{minutes:02}:{seconds:02}"));
    if micros != 0 {
        out.push_str(&format!(".{micros:06}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn elapsed_is_end_minus_start() {
        assert_eq!(elapsed(at(0), at(90)), TimeDelta::seconds(90));
        assert_eq!(elapsed(at(90), at(0)), TimeDelta::seconds(-90));
    }

    #[test]
    fn mean_of_ten_twenty_thirty_is_twenty() {
        let durations = [
            TimeDelta::seconds(10),
            TimeDelta::seconds(20),
            TimeDelta::seconds(30),
        ];
        assert_eq!(mean(&durations), Ok(TimeDelta::seconds(20)));
    }

    #[test]
    fn mean_keeps_sub_second_precision() {
        let durations = [TimeDelta::milliseconds(1), TimeDelta::milliseconds(2)];
        assert_eq!(mean(&durations), Ok(TimeDelta::microseconds(1_500)));
    }

    #[test]
    fn mean_of_empty_is_an_error() {
        assert_eq!(mean(&[]), Err(DurationError::EmptyInput));
    }

    #[test]
    fn mean_reports_overflow() {
        let durations = [TimeDelta::MAX, TimeDelta::MAX];
        assert_eq!(mean(&durations), Err(DurationError::Overflow));
    }

    #[test]
    fn format_elapsed_matches_day_clock_layout() {
        assert_eq!(format_elapsed(TimeDelta::zero()), "0:00:00");
        assert_eq!(format_elapsed(TimeDelta::seconds(3_725)), "1:02:05");
        assert_eq!(
            format_elapsed(TimeDelta::days(1) + TimeDelta::seconds(61)),
            "1 day, 0:01:01"
        );
        assert_eq!(
            format_elapsed(TimeDelta::days(3) + TimeDelta::hours(4) + TimeDelta::microseconds(12)),
            "3 days, 4:00:00.000012"
        );
        assert_eq!(format_elapsed(TimeDelta::seconds(-90)), "-0:01:30");
    }

    #[test]
    fn seconds_f64_conversion() {
        assert!((as_seconds_f64(TimeDelta::milliseconds(2_500)) - 2.5).abs() < f64::EPSILON);
        assert!((as_seconds_f64(TimeDelta::seconds(-4)) + 4.0).abs() < f64::EPSILON);
    }
}
