//! Schedule configuration, backed by the key-value settings table.
//!
//! All keys are optional; defaults describe a practice open 08:00–20:00
//! with a lunch boundary at 13:00 and 30-minute slots. A malformed stored
//! value logs a warning and falls back to its default so one bad row can
//! never take bookings offline.

use std::collections::HashMap;

use chrono::NaiveTime;
use rusqlite::Connection;

use crate::db::{repository, DatabaseError};

/// Application-level constants
pub const APP_NAME: &str = "Praxisbook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info"
}

// Recognized settings keys.
pub const KEY_MORNING_START: &str = "morningStart";
pub const KEY_MORNING_END: &str = "morningEnd";
pub const KEY_AFTERNOON_START: &str = "afternoonStart";
pub const KEY_AFTERNOON_END: &str = "afternoonEnd";
pub const KEY_SLOT_DURATION: &str = "slotDuration";
pub const KEY_REQUEST_TIMEOUT_HOURS: &str = "requestTimeoutHours";
pub const KEY_ADMIN_NOTIFY_EMAIL: &str = "adminNotifyEmail";
pub const KEY_REMINDERS_ENABLED: &str = "remindersEnabled";
pub const KEY_RETENTION_DAYS_EXPIRED: &str = "retentionDaysExpired";
pub const KEY_RETENTION_DAYS_PAST: &str = "retentionDaysPast";

/// Slot and appointment durations the engine accepts, in minutes.
pub const ALLOWED_DURATIONS: [i64; 4] = [15, 30, 45, 60];

/// Half-open civil opening range `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// An inverted or zero-length range contributes no slots.
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub morning: TimeRange,
    pub afternoon: TimeRange,
    pub slot_minutes: i64,
    pub request_timeout_hours: i64,
    pub admin_notify_email: Option<String>,
    pub reminders_enabled: bool,
    pub retention_days_expired: i64,
    pub retention_days_past: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            morning: TimeRange {
                start: hm(8, 0),
                end: hm(13, 0),
            },
            afternoon: TimeRange {
                start: hm(13, 0),
                end: hm(20, 0),
            },
            slot_minutes: 30,
            request_timeout_hours: 48,
            admin_notify_email: None,
            reminders_enabled: true,
            retention_days_expired: 30,
            retention_days_past: 90,
        }
    }
}

impl ScheduleConfig {
    /// Materialize the configuration from stored settings, defaulting every
    /// absent or malformed key.
    pub fn load(conn: &Connection) -> Result<Self, DatabaseError> {
        let stored = repository::all_settings(conn)?;
        let defaults = Self::default();

        let config = Self {
            morning: TimeRange {
                start: parse_time(&stored, KEY_MORNING_START, defaults.morning.start),
                end: parse_time(&stored, KEY_MORNING_END, defaults.morning.end),
            },
            afternoon: TimeRange {
                start: parse_time(&stored, KEY_AFTERNOON_START, defaults.afternoon.start),
                end: parse_time(&stored, KEY_AFTERNOON_END, defaults.afternoon.end),
            },
            slot_minutes: parse_slot_duration(&stored, defaults.slot_minutes),
            request_timeout_hours: parse_int(
                &stored,
                KEY_REQUEST_TIMEOUT_HOURS,
                defaults.request_timeout_hours,
            ),
            admin_notify_email: stored
                .get(KEY_ADMIN_NOTIFY_EMAIL)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            reminders_enabled: parse_bool(&stored, KEY_REMINDERS_ENABLED, defaults.reminders_enabled),
            retention_days_expired: parse_int(
                &stored,
                KEY_RETENTION_DAYS_EXPIRED,
                defaults.retention_days_expired,
            ),
            retention_days_past: parse_int(
                &stored,
                KEY_RETENTION_DAYS_PAST,
                defaults.retention_days_past,
            ),
        };
        Ok(config)
    }

    /// Opening ranges in day order, empty ranges dropped.
    pub fn opening_ranges(&self) -> Vec<TimeRange> {
        [self.morning, self.afternoon]
            .into_iter()
            .filter(|r| !r.is_empty())
            .collect()
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    // Both constants and parsed values stay in 00:00..=23:59.
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn parse_time(stored: &HashMap<String, String>, key: &str, default: NaiveTime) -> NaiveTime {
    match stored.get(key) {
        None => default,
        Some(raw) => match NaiveTime::parse_from_str(raw, "%H:%M") {
            Ok(t) => t,
            Err(_) => {
                tracing::warn!("Malformed time in setting {key}: {raw:?}, using default");
                default
            }
        },
    }
}

fn parse_int(stored: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    match stored.get(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(n) if n > 0 => n,
            _ => {
                tracing::warn!("Malformed number in setting {key}: {raw:?}, using default");
                default
            }
        },
    }
}

fn parse_bool(stored: &HashMap<String, String>, key: &str, default: bool) -> bool {
    match stored.get(key).map(|s| s.trim()) {
        None => default,
        Some("true") | Some("1") => true,
        Some("false") | Some("0") => false,
        Some(raw) => {
            tracing::warn!("Malformed boolean in setting {key}: {raw:?}, using default");
            default
        }
    }
}

fn parse_slot_duration(stored: &HashMap<String, String>, default: i64) -> i64 {
    let value = parse_int(stored, KEY_SLOT_DURATION, default);
    if ALLOWED_DURATIONS.contains(&value) {
        value
    } else {
        tracing::warn!("Slot duration {value} not in {ALLOWED_DURATIONS:?}, using default");
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::set_setting;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn defaults_apply_on_empty_settings() {
        let conn = open_memory_database().unwrap();
        let config = ScheduleConfig::load(&conn).unwrap();

        assert_eq!(config.morning.start, hm(8, 0));
        assert_eq!(config.morning.end, hm(13, 0));
        assert_eq!(config.afternoon.end, hm(20, 0));
        assert_eq!(config.slot_minutes, 30);
        assert_eq!(config.request_timeout_hours, 48);
        assert_eq!(config.admin_notify_email, None);
        assert!(config.reminders_enabled);
        assert_eq!(config.retention_days_expired, 30);
        assert_eq!(config.retention_days_past, 90);
    }

    #[test]
    fn stored_values_override_defaults() {
        let conn = open_memory_database().unwrap();
        set_setting(&conn, KEY_MORNING_START, "07:30").unwrap();
        set_setting(&conn, KEY_SLOT_DURATION, "45").unwrap();
        set_setting(&conn, KEY_ADMIN_NOTIFY_EMAIL, "praxis@example.com").unwrap();
        set_setting(&conn, KEY_REMINDERS_ENABLED, "false").unwrap();

        let config = ScheduleConfig::load(&conn).unwrap();
        assert_eq!(config.morning.start, hm(7, 30));
        assert_eq!(config.slot_minutes, 45);
        assert_eq!(config.admin_notify_email.as_deref(), Some("praxis@example.com"));
        assert!(!config.reminders_enabled);
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let conn = open_memory_database().unwrap();
        set_setting(&conn, KEY_MORNING_START, "late-ish").unwrap();
        set_setting(&conn, KEY_SLOT_DURATION, "17").unwrap();
        set_setting(&conn, KEY_REQUEST_TIMEOUT_HOURS, "-3").unwrap();
        set_setting(&conn, KEY_REMINDERS_ENABLED, "maybe").unwrap();

        let config = ScheduleConfig::load(&conn).unwrap();
        assert_eq!(config.morning.start, hm(8, 0));
        assert_eq!(config.slot_minutes, 30);
        assert_eq!(config.request_timeout_hours, 48);
        assert!(config.reminders_enabled);
    }

    #[test]
    fn empty_range_is_dropped_from_opening_ranges() {
        let conn = open_memory_database().unwrap();
        // Afternoon collapsed: the practice closes at 13:00.
        set_setting(&conn, KEY_AFTERNOON_START, "13:00").unwrap();
        set_setting(&conn, KEY_AFTERNOON_END, "13:00").unwrap();

        let config = ScheduleConfig::load(&conn).unwrap();
        let ranges = config.opening_ranges();
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].start, hm(8, 0));
    }

    #[test]
    fn blank_admin_email_reads_as_none() {
        let conn = open_memory_database().unwrap();
        set_setting(&conn, KEY_ADMIN_NOTIFY_EMAIL, "  ").unwrap();
        let config = ScheduleConfig::load(&conn).unwrap();
        assert_eq!(config.admin_notify_email, None);
    }
}
