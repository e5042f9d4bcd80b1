//! Civil time ↔ absolute instant conversion for the practice calendar.
//!
//! All persistence and conflict math runs on zone-agnostic epoch
//! milliseconds. Patients and staff think in Berlin wall-clock time, so the
//! boundary between the two lives here: conversion resolves the zone's
//! actual UTC offset at the instant in question (DST-correct), not a fixed
//! offset. Also provides the Berlin-civil range helpers (day/week/month/
//! year bounds) used by slot listing, reporting, and retention.

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Europe::Berlin;
use chrono_tz::Tz;

/// The single fixed zone of the calendar.
pub const PRACTICE_TZ: Tz = Berlin;

pub const MS_PER_MINUTE: i64 = 60_000;
pub const MS_PER_DAY: i64 = 86_400_000;

// ─── Conversion ───────────────────────────────────────────────────────────────

/// Resolve a Berlin wall-clock date/time to an absolute instant.
///
/// Total for every input. The repeated fall-back hour resolves to its first
/// occurrence (pre-transition offset). A wall-clock time inside the
/// spring-forward gap does not exist; it shifts forward one hour into the
/// post-transition clock, which keeps back-to-back generated slots adjacent
/// across the gap.
pub fn civil_to_instant(date: NaiveDate, time: NaiveTime) -> i64 {
    let mut naive = date.and_time(time);
    // No IANA gap exceeds a few hours; Berlin's is exactly one.
    for _ in 0..4 {
        match PRACTICE_TZ.from_local_datetime(&naive) {
            LocalResult::Single(dt) => return dt.timestamp_millis(),
            LocalResult::Ambiguous(first, _) => return first.timestamp_millis(),
            LocalResult::None => naive += Duration::hours(1),
        }
    }
    // Unreachable with real tzdb data; fall back to a UTC reading.
    Utc.from_utc_datetime(&naive).timestamp_millis()
}

/// Format an instant as Berlin wall-clock date and time. Unambiguous in
/// this direction.
pub fn instant_to_civil(instant: i64) -> (NaiveDate, NaiveTime) {
    let local = berlin_datetime(instant);
    (local.date_naive(), local.time())
}

/// The Berlin civil date an instant falls on.
pub fn civil_date_of(instant: i64) -> NaiveDate {
    berlin_datetime(instant).date_naive()
}

fn berlin_datetime(instant: i64) -> DateTime<Tz> {
    DateTime::from_timestamp_millis(instant)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
        .with_timezone(&PRACTICE_TZ)
}

// ─── Civil ranges ─────────────────────────────────────────────────────────────

/// `[midnight, next midnight)` of a Berlin civil day, as instants. The span
/// is 23 or 25 hours on DST transition days.
pub fn day_bounds(date: NaiveDate) -> (i64, i64) {
    (
        civil_to_instant(date, NaiveTime::MIN),
        civil_to_instant(add_days(date, 1), NaiveTime::MIN),
    )
}

/// Monday of the ISO week containing `date`.
pub fn week_monday(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// `[Monday 00:00, next Monday 00:00)` of the ISO week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (i64, i64) {
    let monday = week_monday(date);
    (
        civil_to_instant(monday, NaiveTime::MIN),
        civil_to_instant(add_days(monday, 7), NaiveTime::MIN),
    )
}

/// `[1st 00:00, 1st of next month 00:00)`. None for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(i64, i64)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((
        civil_to_instant(first, NaiveTime::MIN),
        civil_to_instant(next, NaiveTime::MIN),
    ))
}

/// `[Jan 1 00:00, Jan 1 of next year 00:00)`. None outside chrono's range.
pub fn year_bounds(year: i32) -> Option<(i64, i64)> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let next = NaiveDate::from_ymd_opt(year + 1, 1, 1)?;
    Some((
        civil_to_instant(first, NaiveTime::MIN),
        civil_to_instant(next, NaiveTime::MIN),
    ))
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

// ─── Formatting ───────────────────────────────────────────────────────────────

/// Numeric Berlin-local formatting, e.g. `15.06.2026 08:00`. Used for
/// notification bodies and report lines; anything richer is presentation.
pub fn format_instant(instant: i64) -> String {
    berlin_datetime(instant).format("%d.%m.%Y %H:%M").to_string()
}

/// Time-of-day only, e.g. `08:00`.
pub fn format_time(instant: i64) -> String {
    berlin_datetime(instant).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn utc_ms(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap().timestamp_millis()
    }

    #[test]
    fn winter_time_is_utc_plus_one() {
        // CET applies in January.
        let instant = civil_to_instant(date(2026, 1, 15), time(8, 0));
        assert_eq!(instant, utc_ms(2026, 1, 15, 7, 0));
    }

    #[test]
    fn summer_time_is_utc_plus_two() {
        // CEST applies in June.
        let instant = civil_to_instant(date(2026, 6, 15), time(8, 0));
        assert_eq!(instant, utc_ms(2026, 6, 15, 6, 0));
    }

    #[test]
    fn round_trip_outside_dst_gap() {
        for (d, t) in [
            (date(2026, 1, 15), time(8, 0)),
            (date(2026, 6, 15), time(12, 30)),
            (date(2026, 3, 29), time(1, 45)),
            (date(2026, 10, 25), time(8, 0)),
            (date(2026, 12, 31), time(19, 30)),
        ] {
            let (rd, rt) = instant_to_civil(civil_to_instant(d, t));
            assert_eq!((rd, rt), (d, t), "round trip failed for {d} {t}");
        }
    }

    #[test]
    fn spring_forward_gap_shifts_one_hour() {
        // 2026-03-29 02:30 does not exist in Berlin; it resolves to 03:30
        // CEST, i.e. 01:30 UTC.
        let instant = civil_to_instant(date(2026, 3, 29), time(2, 30));
        assert_eq!(instant, utc_ms(2026, 3, 29, 1, 30));

        let (_, resolved) = instant_to_civil(instant);
        assert_eq!(resolved.hour(), 3);
        assert_eq!(resolved.minute(), 30);
    }

    #[test]
    fn fall_back_ambiguity_picks_first_occurrence() {
        // 2026-10-25 02:30 happens twice; the first occurrence is still
        // CEST (+02:00), i.e. 00:30 UTC.
        let instant = civil_to_instant(date(2026, 10, 25), time(2, 30));
        assert_eq!(instant, utc_ms(2026, 10, 25, 0, 30));
    }

    #[test]
    fn day_bounds_shrink_and_stretch_on_transition_days() {
        let (start, end) = day_bounds(date(2026, 6, 15));
        assert_eq!(end - start, 24 * 60 * MS_PER_MINUTE);

        let (start, end) = day_bounds(date(2026, 3, 29));
        assert_eq!(end - start, 23 * 60 * MS_PER_MINUTE);

        let (start, end) = day_bounds(date(2026, 10, 25));
        assert_eq!(end - start, 25 * 60 * MS_PER_MINUTE);
    }

    #[test]
    fn week_monday_rewinds_to_monday() {
        // 2026-06-17 is a Wednesday.
        assert_eq!(week_monday(date(2026, 6, 17)), date(2026, 6, 15));
        assert_eq!(week_monday(date(2026, 6, 15)), date(2026, 6, 15));
        assert_eq!(week_monday(date(2026, 6, 21)), date(2026, 6, 15));
    }

    #[test]
    fn week_and_month_bounds_cover_their_spans() {
        let (from, to) = week_bounds(date(2026, 6, 17));
        assert_eq!(civil_date_of(from), date(2026, 6, 15));
        assert_eq!(civil_date_of(to), date(2026, 6, 22));

        let (from, to) = month_bounds(2026, 6).unwrap();
        assert_eq!(civil_date_of(from), date(2026, 6, 1));
        assert_eq!(civil_date_of(to), date(2026, 7, 1));
        assert!(month_bounds(2026, 13).is_none());
    }

    #[test]
    fn year_bounds_cover_the_year() {
        let (from, to) = year_bounds(2026).unwrap();
        assert_eq!(civil_date_of(from), date(2026, 1, 1));
        assert_eq!(civil_date_of(to), date(2027, 1, 1));
    }

    #[test]
    fn formatting_is_numeric_berlin_local() {
        let instant = civil_to_instant(date(2026, 6, 15), time(8, 0));
        assert_eq!(format_instant(instant), "15.06.2026 08:00");
        assert_eq!(format_time(instant), "08:00");
    }
}
