//! Day/night boundaries derived from the record's sunrise and sunset.
//!
//! Every value is milliseconds since local midnight, so boundaries compare
//! without any calendar arithmetic.

use crate::clock::Clock;
use crate::types::WeatherRecord;

pub const HOUR_MS: i64 = 60 * 60 * 1000;
pub const DAY_MS: i64 = 24 * HOUR_MS;
pub const DEFAULT_SUNRISE_MS: i64 = 6 * HOUR_MS;
pub const DEFAULT_SUNSET_MS: i64 = 18 * HOUR_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunInfo {
    pub now: i64,
    pub sunrise: i64,
    pub sunset: i64,
    pub morning_begins: i64,
    pub day_begins: i64,
    pub dusk_begins: i64,
    pub night_begins: i64,
    pub is_day: bool,
}

/// Reduce a Unix instant to local time of day.
///
/// Each term is reduced before adding, so stored sun times at the edge of
/// the `i64` range cannot overflow.
pub fn time_of_day(unix_ms: i64, utc_offset_ms: i64) -> i64 {
    (unix_ms.rem_euclid(DAY_MS) + utc_offset_ms.rem_euclid(DAY_MS)).rem_euclid(DAY_MS)
}

fn shift(clock_ms: i64, by_ms: i64) -> i64 {
    time_of_day(clock_ms, by_ms)
}

/// Compute sun boundaries for `record`, or the 06:00/18:00 defaults when the
/// record is absent or its sun times have expired.
///
/// `is_day` only holds strictly between sunrise and sunset on the reduced
/// clock; a sunset that wraps past midnight therefore never reads as day.
pub fn sun_info(record: Option<&WeatherRecord>, clock: &dyn Clock) -> SunInfo {
    let wall_ms = clock.now_ms();
    let offset = clock.utc_offset_ms();
    let now = time_of_day(wall_ms, offset);

    let (sunrise, sunset) = match record {
        Some(data) if data.sun_valid_at(wall_ms) => (
            time_of_day(data.sys.sunrise.saturating_mul(1000), offset),
            time_of_day(data.sys.sunset.saturating_mul(1000), offset),
        ),
        _ => (DEFAULT_SUNRISE_MS, DEFAULT_SUNSET_MS),
    };

    SunInfo {
        now,
        sunrise,
        sunset,
        morning_begins: shift(sunrise, -2 * HOUR_MS),
        day_begins: shift(sunrise, 2 * HOUR_MS),
        dusk_begins: shift(sunset, -HOUR_MS),
        night_begins: shift(sunset, HOUR_MS),
        is_day: sunrise < now && now < sunset,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{Condition, MainReadings, SunTimes};

    /// 2023-11-14T00:00:00Z
    const MIDNIGHT_MS: i64 = 1_699_920_000_000;

    fn record(sunrise_ms: i64, sunset_ms: i64, sun_expiration: i64) -> WeatherRecord {
        WeatherRecord {
            main: MainReadings {
                temp: serde_json::json!(10),
            },
            weather: vec![Condition {
                id: 800,
                description: "clear sky".into(),
            }],
            sys: SunTimes {
                sunrise: sunrise_ms / 1000,
                sunset: sunset_ms / 1000,
            },
            hard_expiration: i64::MAX,
            fresh_expiration: i64::MAX,
            sun_expiration,
        }
    }

    #[test]
    fn test_boundaries_follow_record() {
        let clock = ManualClock::new(MIDNIGHT_MS + 12 * HOUR_MS);
        let data = record(MIDNIGHT_MS + 7 * HOUR_MS, MIDNIGHT_MS + 17 * HOUR_MS, i64::MAX);

        let info = sun_info(Some(&data), &clock);
        assert_eq!(info.now, 12 * HOUR_MS);
        assert_eq!(info.sunrise, 7 * HOUR_MS);
        assert_eq!(info.sunset, 17 * HOUR_MS);
        assert_eq!(info.morning_begins, 5 * HOUR_MS);
        assert_eq!(info.day_begins, 9 * HOUR_MS);
        assert_eq!(info.dusk_begins, 16 * HOUR_MS);
        assert_eq!(info.night_begins, 18 * HOUR_MS);
        assert!(info.is_day);
    }

    #[test]
    fn test_yesterdays_sun_times_reduce_to_same_clock() {
        let clock = ManualClock::new(MIDNIGHT_MS + 20 * HOUR_MS);
        let data = record(
            MIDNIGHT_MS - DAY_MS + 7 * HOUR_MS,
            MIDNIGHT_MS - DAY_MS + 17 * HOUR_MS,
            i64::MAX,
        );

        let info = sun_info(Some(&data), &clock);
        assert_eq!(info.sunrise, 7 * HOUR_MS);
        assert_eq!(info.sunset, 17 * HOUR_MS);
        assert!(!info.is_day);
    }

    #[test]
    fn test_expired_sun_times_use_defaults() {
        let now = MIDNIGHT_MS + 12 * HOUR_MS;
        let clock = ManualClock::new(now);
        let data = record(MIDNIGHT_MS + 9 * HOUR_MS, MIDNIGHT_MS + 11 * HOUR_MS, now);

        let info = sun_info(Some(&data), &clock);
        assert_eq!(info.sunrise, DEFAULT_SUNRISE_MS);
        assert_eq!(info.sunset, DEFAULT_SUNSET_MS);
        assert_eq!(info.morning_begins, 4 * HOUR_MS);
        assert_eq!(info.night_begins, 19 * HOUR_MS);
        assert!(info.is_day);
    }

    #[test]
    fn test_no_record_uses_defaults() {
        let clock = ManualClock::new(MIDNIGHT_MS + 3 * HOUR_MS);
        let info = sun_info(None, &clock);
        assert_eq!(info.sunrise, DEFAULT_SUNRISE_MS);
        assert_eq!(info.sunset, DEFAULT_SUNSET_MS);
        assert!(!info.is_day);
    }

    #[test]
    fn test_boundaries_wrap_around_midnight() {
        let clock = ManualClock::new(MIDNIGHT_MS + 12 * HOUR_MS);
        let data = record(
            MIDNIGHT_MS + HOUR_MS,
            MIDNIGHT_MS + 23 * HOUR_MS + 30 * 60 * 1000,
            i64::MAX,
        );

        let info = sun_info(Some(&data), &clock);
        assert_eq!(info.morning_begins, 23 * HOUR_MS);
        assert_eq!(info.night_begins, 30 * 60 * 1000);
        assert!(info.is_day);
    }

    #[test]
    fn test_local_offset_applies_to_now_and_sun_times() {
        // 12:00Z is 07:00 at UTC-5
        let clock = ManualClock::new(MIDNIGHT_MS + 12 * HOUR_MS)
            .with_utc_offset(chrono::Duration::hours(-5));
        let data = record(MIDNIGHT_MS + 12 * HOUR_MS, MIDNIGHT_MS + 22 * HOUR_MS, i64::MAX);

        let info = sun_info(Some(&data), &clock);
        assert_eq!(info.now, 7 * HOUR_MS);
        assert_eq!(info.sunrise, 7 * HOUR_MS);
        assert_eq!(info.sunset, 17 * HOUR_MS);
        // Exactly at sunrise is not yet day
        assert!(!info.is_day);
    }

    #[test]
    fn test_sunset_wrapping_past_midnight_is_never_day() {
        // Sunrise 20:00, sunset 04:00 on the reduced clock
        let clock = ManualClock::new(MIDNIGHT_MS + 22 * HOUR_MS);
        let data = record(MIDNIGHT_MS + 20 * HOUR_MS, MIDNIGHT_MS + 28 * HOUR_MS, i64::MAX);

        let info = sun_info(Some(&data), &clock);
        assert_eq!(info.sunset, 4 * HOUR_MS);
        assert!(!info.is_day);
    }

    #[test]
    fn test_out_of_range_sun_times_do_not_overflow() {
        let clock = ManualClock::new(MIDNIGHT_MS + 12 * HOUR_MS)
            .with_utc_offset(chrono::Duration::hours(2));
        let mut data = record(0, MIDNIGHT_MS + 17 * HOUR_MS, i64::MAX);
        data.sys.sunrise = i64::MAX / 1000 + 1;
        data.sys.sunset = i64::MIN / 1000 - 1;

        let info = sun_info(Some(&data), &clock);
        assert_eq!(info.now, 14 * HOUR_MS);
        assert_eq!(info.sunrise, time_of_day(i64::MAX, 2 * HOUR_MS));
        assert_eq!(info.sunset, time_of_day(i64::MIN, 2 * HOUR_MS));
        assert!((0..DAY_MS).contains(&info.sunrise));
        assert!((0..DAY_MS).contains(&info.sunset));
        assert!((0..DAY_MS).contains(&info.night_begins));
    }
}
