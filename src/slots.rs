//! Bookable slot grid for a practice day.
//!
//! Slots are stepped through civil time inside each opening range, then each
//! start is resolved to an instant on its own. A slot's end is start plus
//! the slot length in absolute milliseconds, so every slot is exactly as
//! long as advertised even on DST days.

use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::config::ScheduleConfig;
use crate::config::TimeRange;
use crate::error::SchedulingError;
use crate::models::Slot;
use crate::overlap::BatchConflictChecker;
use crate::timezone::{self, MS_PER_MINUTE};

/// Generate the slot grid for one day. Only slots that fit entirely inside
/// an opening range survive, and only strictly future ones (`start > now`).
///
/// On a spring-forward day two civil starts can resolve to the same
/// instant; the first one wins and later duplicates are dropped.
pub fn generate_slots(
    date: NaiveDate,
    ranges: &[TimeRange],
    slot_minutes: i64,
    now: i64,
) -> Vec<Slot> {
    let step = Duration::minutes(slot_minutes);
    let mut slots = Vec::new();

    for range in ranges {
        let mut civil = range.start;
        let mut last_start = i64::MIN;
        loop {
            let (slot_end_civil, wrap) = civil.overflowing_add_signed(step);
            if wrap != 0 || slot_end_civil > range.end {
                break;
            }

            let start = timezone::civil_to_instant(date, civil);
            if start > last_start {
                last_start = start;
                if start > now {
                    slots.push(Slot::new(start, start + slot_minutes * MS_PER_MINUTE));
                }
            }

            civil = slot_end_civil;
        }
    }

    slots
}

/// Slot grid for `date` minus everything already occupied by an active
/// appointment or a blocker. Two storage reads regardless of grid size.
pub fn available_slots(
    conn: &Connection,
    date: NaiveDate,
    config: &ScheduleConfig,
    now: i64,
) -> Result<Vec<Slot>, SchedulingError> {
    let ranges = config.opening_ranges();
    let slots = generate_slots(date, &ranges, config.slot_minutes, now);

    let (Some(first), Some(last)) = (slots.first(), slots.last()) else {
        return Ok(Vec::new());
    };
    let checker = BatchConflictChecker::load(conn, first.start_time, last.end_time)?;

    Ok(slots
        .iter()
        .copied()
        .filter(|slot| checker.is_free(slot.start_time, slot.end_time))
        .collect())
}
