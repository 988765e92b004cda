//! Countdown arithmetic
//!
//! Splits the time remaining until a target instant into display units.
//! Each unit is the remainder after extracting the larger one, so
//! `hours` is hours within the current day, not total hours.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Time remaining until a target, split into units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownParts {
    /// Whole days
    pub days: u64,
    /// Hours within the day (0..24)
    pub hours: u32,
    /// Minutes within the hour (0..60)
    pub minutes: u32,
    /// Seconds within the minute (0..60)
    pub seconds: u32,
    /// Milliseconds within the second (0..1000)
    pub milliseconds: u32,
    /// Target has been reached
    pub elapsed: bool,
}

impl CountdownParts {
    /// All-zero parts for a target that has been reached
    #[inline]
    #[must_use]
    pub fn elapsed() -> Self {
        Self {
            elapsed: true,
            ..Self::default()
        }
    }

    /// Recombine the parts into a millisecond total
    #[must_use]
    pub fn total_milliseconds(&self) -> u64 {
        self.days * MS_PER_DAY
            + u64::from(self.hours) * MS_PER_HOUR
            + u64::from(self.minutes) * MS_PER_MINUTE
            + u64::from(self.seconds) * MS_PER_SECOND
            + u64::from(self.milliseconds)
    }
}

/// Compute the time remaining from `now` until `target`
///
/// `target <= now` counts as elapsed and yields all zeros.
#[must_use]
pub fn diff(target: DateTime<Utc>, now: DateTime<Utc>) -> CountdownParts {
    let remaining = (target - now).num_milliseconds();
    let Ok(total) = u64::try_from(remaining) else {
        return CountdownParts::elapsed();
    };
    if total == 0 {
        return CountdownParts::elapsed();
    }

    // Remainders are bounded by their divisors, so the narrowing is lossless.
    let unit = |ms: u64, per: u64, modulo: u64| u32::try_from((ms / per) % modulo).unwrap_or(0);

    CountdownParts {
        days: total / MS_PER_DAY,
        hours: unit(total, MS_PER_HOUR, 24),
        minutes: unit(total, MS_PER_MINUTE, 60),
        seconds: unit(total, MS_PER_SECOND, 60),
        milliseconds: unit(total, 1, 1_000),
        elapsed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn equal_instants_are_elapsed() {
        let now = base();
        let parts = diff(now, now);
        assert_eq!(parts, CountdownParts::elapsed());
        assert!(parts.elapsed);
        assert_eq!(parts.total_milliseconds(), 0);
    }

    #[test]
    fn one_millisecond_ahead_is_not_elapsed() {
        let now = base();
        let parts = diff(now + Duration::milliseconds(1), now);
        assert!(!parts.elapsed);
        assert_eq!(parts.milliseconds, 1);
        assert_eq!(parts.seconds, 0);
        assert_eq!(parts.days, 0);
    }

    #[test]
    fn past_target_is_elapsed() {
        let now = base();
        assert_eq!(diff(now - Duration::days(3), now), CountdownParts::elapsed());
    }

    #[test]
    fn units_are_remainders() {
        let now = base();
        let target = now
            + Duration::days(12)
            + Duration::hours(5)
            + Duration::minutes(42)
            + Duration::seconds(7)
            + Duration::milliseconds(250);

        let parts = diff(target, now);
        assert_eq!(
            parts,
            CountdownParts {
                days: 12,
                hours: 5,
                minutes: 42,
                seconds: 7,
                milliseconds: 250,
                elapsed: false,
            }
        );
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(CountdownParts::elapsed()).unwrap();
        assert_eq!(json["elapsed"], true);
        assert_eq!(json["milliseconds"], 0);
    }

    proptest! {
        #[test]
        fn prop_parts_recombine_to_total(ms in 1i64..10_000_000_000i64) {
            let now = base();
            let parts = diff(now + Duration::milliseconds(ms), now);
            prop_assert!(!parts.elapsed);
            prop_assert_eq!(parts.total_milliseconds(), u64::try_from(ms).unwrap());
            prop_assert!(parts.hours < 24);
            prop_assert!(parts.minutes < 60);
            prop_assert!(parts.seconds < 60);
            prop_assert!(parts.milliseconds < 1000);
        }
    }
}
