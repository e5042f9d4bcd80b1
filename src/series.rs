//! Recurring commitments and scoped removal.
//!
//! Series expand through civil time: every occurrence keeps the first
//! occurrence's wall-clock start, with DST offsets absorbed by re-resolving
//! each date through the practice timezone. Expansion runs in one
//! transaction with per-occurrence conflict skip, and the caller learns
//! exactly which instants were dropped.

use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::{normalize, optional_email};
use crate::config::ALLOWED_DURATIONS;
use crate::db::repository::{
    delete_appointment, delete_appointment_series, delete_blocker, delete_blocker_group,
    get_appointment, get_blocker, insert_appointment, insert_blocker,
};
use crate::db::DatabaseError;
use crate::error::SchedulingError;
use crate::models::enums::{AppointmentStatus, BlockerDeleteScope, DeleteScope};
use crate::models::{Appointment, Blocker};
use crate::notes::{review_notes, NotesVerdict};
use crate::overlap::{has_conflicts, BatchConflictChecker};
use crate::timezone::{self, MS_PER_MINUTE};

/// Weekly patient series stay within one year.
pub const MAX_WEEKLY_OCCURRENCES: i64 = 52;
/// Daily blockers may cover a full year.
pub const MAX_BLOCKER_OCCURRENCES: i64 = 365;

// ─── Requests & outcomes ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointmentSeries {
    pub patient_name: String,
    pub first_start: i64,
    pub duration_minutes: i64,
    /// Total occurrences including the first, one week apart.
    pub count: i64,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBlocker {
    pub title: String,
    pub start_time: i64,
    pub end_time: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBlockerSeries {
    pub title: String,
    pub first_start: i64,
    pub first_end: i64,
    /// Total occurrences including the first.
    pub count: i64,
    /// Civil days between occurrence starts.
    pub interval_days: i64,
}

/// What an expansion actually produced. `skipped` holds the start instants
/// dropped to a conflict.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesOutcome {
    pub series_id: String,
    pub created: Vec<String>,
    pub skipped: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockerSeriesOutcome {
    pub blocker_group_id: String,
    pub created: Vec<String>,
    pub skipped: Vec<i64>,
}

// ─── Appointment series ──────────────────────────────────────────────────

/// Expand a weekly series of CONFIRMED appointments.
///
/// Conflicting occurrences are skipped, everything else commits together.
/// Conflicts are checked against one pre-loaded snapshot of the whole
/// span plus the occurrences accepted earlier in the same expansion.
pub fn create_appointment_series(
    conn: &mut Connection,
    series: &NewAppointmentSeries,
    now: i64,
) -> Result<SeriesOutcome, SchedulingError> {
    let name = series.patient_name.trim();
    if name.is_empty() {
        return Err(SchedulingError::validation("patient_name", "must not be empty"));
    }
    if !ALLOWED_DURATIONS.contains(&series.duration_minutes) {
        return Err(SchedulingError::validation(
            "duration_minutes",
            "must be one of 15, 30, 45 or 60",
        ));
    }
    if !(1..=MAX_WEEKLY_OCCURRENCES).contains(&series.count) {
        return Err(SchedulingError::validation(
            "count",
            format!("must be between 1 and {MAX_WEEKLY_OCCURRENCES}"),
        ));
    }
    let email = optional_email(series.contact_email.as_deref())?;
    let flagged = match review_notes(series.notes.as_deref()) {
        NotesVerdict::Rejected { reason } => {
            return Err(SchedulingError::Validation { field: "notes", reason })
        }
        verdict => verdict.is_flagged(),
    };
    let phone = normalize(series.contact_phone.as_deref());
    let notes = normalize(series.notes.as_deref());

    let duration_ms = series.duration_minutes * MS_PER_MINUTE;
    let starts: Vec<i64> = (0..series.count)
        .map(|week| shift_civil_days(series.first_start, 7 * week))
        .collect();
    let span_end = starts.last().copied().unwrap_or(series.first_start) + duration_ms;

    let series_id = Uuid::new_v4().to_string();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;
    let mut checker = BatchConflictChecker::load(&tx, series.first_start, span_end)?;

    let mut created = Vec::new();
    let mut skipped = Vec::new();
    for start in starts {
        let end = start + duration_ms;
        if checker.conflicts(start, end) {
            skipped.push(start);
            continue;
        }
        let appointment = Appointment {
            id: Uuid::new_v4().to_string(),
            patient_name: name.to_string(),
            start_time: start,
            end_time: end,
            duration_minutes: series.duration_minutes,
            status: AppointmentStatus::Confirmed,
            series_id: Some(series_id.clone()),
            contact_email: email.clone(),
            contact_phone: phone.clone(),
            notes: notes.clone(),
            flagged_notes: flagged,
            reminder_sent: false,
            created_at: now,
            updated_at: now,
        };
        insert_appointment(&tx, &appointment)?;
        checker.occupy(start, end);
        created.push(appointment.id);
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        "Series {series_id}: created {}, skipped {}",
        created.len(),
        skipped.len()
    );
    Ok(SeriesOutcome { series_id, created, skipped })
}

// ─── Blockers ────────────────────────────────────────────────────────────

/// One-off blocker. The no-overlap rule applies to blockers too, so an
/// occupied span is refused rather than silently stacked.
pub fn create_blocker(
    conn: &Connection,
    new: &NewBlocker,
    now: i64,
) -> Result<Blocker, SchedulingError> {
    let title = new.title.trim();
    if title.is_empty() {
        return Err(SchedulingError::validation("title", "must not be empty"));
    }
    if new.end_time <= new.start_time {
        return Err(SchedulingError::validation("end_time", "must be after start_time"));
    }
    if has_conflicts(conn, new.start_time, new.end_time, None)? {
        return Err(SchedulingError::SlotTaken {
            start_time: new.start_time,
            end_time: new.end_time,
        });
    }

    let blocker = Blocker {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        start_time: new.start_time,
        end_time: new.end_time,
        blocker_group_id: None,
        created_at: now,
    };
    insert_blocker(conn, &blocker)?;
    tracing::info!("Created blocker {}", blocker.id);
    Ok(blocker)
}

/// Expand a periodic blocker series (e.g. a daily lunch break).
///
/// Start and end both shift by whole civil days, so an occurrence landing
/// on a DST day keeps its wall-clock bounds. An occurrence whose span
/// collapses in the spring-forward gap is skipped.
pub fn create_blocker_series(
    conn: &mut Connection,
    series: &NewBlockerSeries,
    now: i64,
) -> Result<BlockerSeriesOutcome, SchedulingError> {
    let title = series.title.trim();
    if title.is_empty() {
        return Err(SchedulingError::validation("title", "must not be empty"));
    }
    if series.first_end <= series.first_start {
        return Err(SchedulingError::validation("end_time", "must be after start_time"));
    }
    if !(1..=MAX_BLOCKER_OCCURRENCES).contains(&series.count) {
        return Err(SchedulingError::validation(
            "count",
            format!("must be between 1 and {MAX_BLOCKER_OCCURRENCES}"),
        ));
    }
    if series.interval_days < 1 {
        return Err(SchedulingError::validation("interval_days", "must be at least 1"));
    }

    let spans: Vec<(i64, i64)> = (0..series.count)
        .map(|k| {
            let days = k * series.interval_days;
            (
                shift_civil_days(series.first_start, days),
                shift_civil_days(series.first_end, days),
            )
        })
        .collect();
    let span_end = spans.iter().map(|&(_, end)| end).max().unwrap_or(series.first_end);

    let group_id = Uuid::new_v4().to_string();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;
    let mut checker = BatchConflictChecker::load(&tx, series.first_start, span_end)?;

    let mut created = Vec::new();
    let mut skipped = Vec::new();
    for (start, end) in spans {
        if end <= start || checker.conflicts(start, end) {
            skipped.push(start);
            continue;
        }
        let blocker = Blocker {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            start_time: start,
            end_time: end,
            blocker_group_id: Some(group_id.clone()),
            created_at: now,
        };
        insert_blocker(&tx, &blocker)?;
        checker.occupy(start, end);
        created.push(blocker.id);
    }
    tx.commit().map_err(DatabaseError::from)?;

    tracing::info!(
        "Blocker group {group_id}: created {}, skipped {}",
        created.len(),
        skipped.len()
    );
    Ok(BlockerSeriesOutcome {
        blocker_group_id: group_id,
        created,
        skipped,
    })
}

// ─── Scoped removal ──────────────────────────────────────────────────────

/// Delete one appointment or its entire series. Returns the number of
/// rows removed. Series scope on a row without a series falls back to the
/// single row.
pub fn remove_appointment(
    conn: &Connection,
    id: &str,
    scope: DeleteScope,
) -> Result<usize, SchedulingError> {
    match scope {
        DeleteScope::Single => {
            delete_appointment(conn, id)?;
            Ok(1)
        }
        DeleteScope::Series => {
            let appointment = get_appointment(conn, id)?;
            match appointment.series_id {
                Some(series_id) => Ok(delete_appointment_series(conn, &series_id)?),
                None => {
                    delete_appointment(conn, id)?;
                    Ok(1)
                }
            }
        }
    }
}

/// Delete one blocker or its entire group.
pub fn remove_blocker(
    conn: &Connection,
    id: &str,
    scope: BlockerDeleteScope,
) -> Result<usize, SchedulingError> {
    match scope {
        BlockerDeleteScope::Single => {
            delete_blocker(conn, id)?;
            Ok(1)
        }
        BlockerDeleteScope::Group => {
            let blocker = get_blocker(conn, id)?;
            match blocker.blocker_group_id {
                Some(group_id) => Ok(delete_blocker_group(conn, &group_id)?),
                None => {
                    delete_blocker(conn, id)?;
                    Ok(1)
                }
            }
        }
    }
}

/// Same wall-clock time `days` civil days later.
fn shift_civil_days(instant: i64, days: i64) -> i64 {
    let (date, time) = timezone::instant_to_civil(instant);
    timezone::civil_to_instant(timezone::add_days(date, days), time)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use super::*;
    use crate::db::repository::{find_overlapping_blockers, list_appointments_in_range};
    use crate::db::sqlite::open_memory_database;
    use crate::timezone::MS_PER_DAY;

    const MIN: i64 = MS_PER_MINUTE;
    const HOUR: i64 = 60 * MIN;

    fn civil(y: i32, m: u32, d: u32, h: u32, min: u32) -> i64 {
        timezone::civil_to_instant(
            NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            NaiveTime::from_hms_opt(h, min, 0).unwrap(),
        )
    }

    fn weekly(first_start: i64, count: i64) -> NewAppointmentSeries {
        NewAppointmentSeries {
            patient_name: "Anna Schmidt".into(),
            first_start,
            duration_minutes: 30,
            count,
            contact_email: None,
            contact_phone: None,
            notes: None,
        }
    }

    #[test]
    fn weekly_series_skips_only_the_conflicting_occurrence() {
        let mut conn = open_memory_database().unwrap();

        // Occurrence 5 of 10 (2026-07-13) is blocked.
        let blocked_start = civil(2026, 7, 13, 9, 0);
        create_blocker(
            &conn,
            &NewBlocker {
                title: "Fortbildung".into(),
                start_time: blocked_start,
                end_time: blocked_start + 30 * MIN,
            },
            0,
        )
        .unwrap();

        let outcome =
            create_appointment_series(&mut conn, &weekly(civil(2026, 6, 15, 9, 0), 10), 0).unwrap();

        assert_eq!(outcome.created.len(), 9);
        assert_eq!(outcome.skipped, vec![blocked_start]);

        let first = get_appointment(&conn, &outcome.created[0]).unwrap();
        assert_eq!(first.status, AppointmentStatus::Confirmed);
        assert_eq!(first.series_id.as_deref(), Some(outcome.series_id.as_str()));
    }

    #[test]
    fn weekly_series_keeps_wall_clock_time_across_spring_forward() {
        let mut conn = open_memory_database().unwrap();
        // 2026-03-16 through 2026-04-06 straddles the 2026-03-29 transition.
        let outcome =
            create_appointment_series(&mut conn, &weekly(civil(2026, 3, 16, 9, 0), 4), 0).unwrap();
        assert_eq!(outcome.created.len(), 4);

        let mut starts: Vec<i64> = outcome
            .created
            .iter()
            .map(|id| get_appointment(&conn, id).unwrap().start_time)
            .collect();
        starts.sort_unstable();

        for &start in &starts {
            let (_, time) = timezone::instant_to_civil(start);
            assert_eq!(time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        }
        // The week crossing the transition is one absolute hour short.
        assert_eq!(starts[1] - starts[0], 7 * MS_PER_DAY);
        assert_eq!(starts[2] - starts[1], 7 * MS_PER_DAY - HOUR);
        assert_eq!(starts[3] - starts[2], 7 * MS_PER_DAY);
    }

    #[test]
    fn series_count_is_bounded() {
        let mut conn = open_memory_database().unwrap();
        for bad in [0, 53] {
            match create_appointment_series(&mut conn, &weekly(civil(2026, 6, 15, 9, 0), bad), 0) {
                Err(SchedulingError::Validation { field, .. }) => assert_eq!(field, "count"),
                other => panic!("expected count validation, got {other:?}"),
            }
        }
    }

    #[test]
    fn blocker_refuses_occupied_and_inverted_spans() {
        let mut conn = open_memory_database().unwrap();
        let nine = civil(2026, 6, 15, 9, 0);
        create_appointment_series(&mut conn, &weekly(nine, 1), 0).unwrap();

        let clash = create_blocker(
            &conn,
            &NewBlocker {
                title: "Mittagspause".into(),
                start_time: nine + 15 * MIN,
                end_time: nine + 45 * MIN,
            },
            0,
        );
        assert!(clash.unwrap_err().is_conflict());

        let inverted = create_blocker(
            &conn,
            &NewBlocker {
                title: "Mittagspause".into(),
                start_time: nine + HOUR,
                end_time: nine + HOUR,
            },
            0,
        );
        assert!(matches!(
            inverted,
            Err(SchedulingError::Validation { field: "end_time", .. })
        ));

        // Adjacent to the appointment is fine.
        create_blocker(
            &conn,
            &NewBlocker {
                title: "Mittagspause".into(),
                start_time: nine + 30 * MIN,
                end_time: nine + HOUR,
            },
            0,
        )
        .unwrap();
    }

    #[test]
    fn daily_blocker_series_skips_occupied_days() {
        let mut conn = open_memory_database().unwrap();
        // Day two's lunch span is already taken by an appointment.
        let lunch_day2 = civil(2026, 6, 16, 12, 0);
        create_appointment_series(&mut conn, &weekly(lunch_day2, 1), 0).unwrap();

        let outcome = create_blocker_series(
            &mut conn,
            &NewBlockerSeries {
                title: "Mittagspause".into(),
                first_start: civil(2026, 6, 15, 12, 0),
                first_end: civil(2026, 6, 15, 13, 0),
                count: 3,
                interval_days: 1,
            },
            0,
        )
        .unwrap();

        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.skipped, vec![lunch_day2]);

        let stored = find_overlapping_blockers(
            &conn,
            civil(2026, 6, 15, 0, 0),
            civil(2026, 6, 18, 0, 0),
        )
        .unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored
            .iter()
            .all(|b| b.blocker_group_id.as_deref() == Some(outcome.blocker_group_id.as_str())));
    }

    #[test]
    fn blocker_series_members_cannot_overlap_each_other() {
        let mut conn = open_memory_database().unwrap();
        // 25-hour spans one day apart: each occurrence overlaps the next.
        let outcome = create_blocker_series(
            &mut conn,
            &NewBlockerSeries {
                title: "Umbau".into(),
                first_start: civil(2026, 6, 15, 10, 0),
                first_end: civil(2026, 6, 16, 11, 0),
                count: 3,
                interval_days: 1,
            },
            0,
        )
        .unwrap();

        // Occurrence 2 collides with 1; occurrence 3 starts after 1 ends.
        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.skipped, vec![civil(2026, 6, 16, 10, 0)]);
    }

    #[test]
    fn remove_appointment_honors_scope() {
        let mut conn = open_memory_database().unwrap();
        let outcome =
            create_appointment_series(&mut conn, &weekly(civil(2026, 6, 15, 9, 0), 3), 0).unwrap();

        let removed =
            remove_appointment(&conn, &outcome.created[1], DeleteScope::Single).unwrap();
        assert_eq!(removed, 1);

        let removed =
            remove_appointment(&conn, &outcome.created[0], DeleteScope::Series).unwrap();
        assert_eq!(removed, 2);
        assert!(list_appointments_in_range(&conn, 0, i64::MAX).unwrap().is_empty());
    }

    #[test]
    fn remove_blocker_group_takes_all_members() {
        let mut conn = open_memory_database().unwrap();
        let outcome = create_blocker_series(
            &mut conn,
            &NewBlockerSeries {
                title: "Mittagspause".into(),
                first_start: civil(2026, 6, 15, 12, 0),
                first_end: civil(2026, 6, 15, 13, 0),
                count: 3,
                interval_days: 1,
            },
            0,
        )
        .unwrap();

        let removed =
            remove_blocker(&conn, &outcome.created[0], BlockerDeleteScope::Group).unwrap();
        assert_eq!(removed, 3);

        // A loner blocker under group scope removes just itself.
        let single = create_blocker(
            &conn,
            &NewBlocker {
                title: "Fortbildung".into(),
                start_time: civil(2026, 6, 20, 9, 0),
                end_time: civil(2026, 6, 20, 17, 0),
            },
            0,
        )
        .unwrap();
        let removed = remove_blocker(&conn, &single.id, BlockerDeleteScope::Group).unwrap();
        assert_eq!(removed, 1);
    }

    #[test]
    fn removing_a_missing_row_reports_not_found() {
        let conn = open_memory_database().unwrap();
        match remove_appointment(&conn, "nope", DeleteScope::Single) {
            Err(SchedulingError::NotFound { entity_type, .. }) => {
                assert_eq!(entity_type, "Appointment")
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        match remove_blocker(&conn, "nope", BlockerDeleteScope::Group) {
            Err(SchedulingError::NotFound { entity_type, .. }) => {
                assert_eq!(entity_type, "Blocker")
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
