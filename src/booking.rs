//! Booking paths for single appointments.
//!
//! Patient self-booking runs inside an immediate transaction: the conflict
//! check and the insert hold the write lock together, so two requests for
//! the same slot serialize and the loser sees the winner's row. Admin
//! creation and rescheduling go through the same conflict check but trust
//! the caller more (no consent gate).

use std::sync::LazyLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{ScheduleConfig, ALLOWED_DURATIONS};
use crate::db::repository::{
    enqueue_notification, get_appointment, insert_appointment, list_series_from,
    update_appointment_times,
};
use crate::db::DatabaseError;
use crate::error::SchedulingError;
use crate::models::enums::{AppointmentStatus, EditScope};
use crate::models::Appointment;
use crate::notes::{review_notes, NotesVerdict};
use crate::overlap::has_conflicts;
use crate::timezone::{self, MS_PER_MINUTE};

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Trim an optional email and validate it when present.
pub(crate) fn optional_email(value: Option<&str>) -> Result<Option<String>, SchedulingError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(email) if EMAIL_PATTERN.is_match(email) => Ok(Some(email.to_string())),
        Some(_) => Err(SchedulingError::validation(
            "contact_email",
            "is not a valid email address",
        )),
    }
}

// ─── Requests ────────────────────────────────────────────────────────────

/// Patient-facing booking request. Contact email is mandatory because the
/// whole lifecycle (confirmation, reminder) runs over it.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub patient_name: String,
    pub start_time: i64,
    pub duration_minutes: i64,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
    pub consent_given: bool,
}

/// Admin-entered appointment. Status defaults to CONFIRMED.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAppointment {
    pub patient_name: String,
    pub start_time: i64,
    pub duration_minutes: i64,
    pub status: Option<AppointmentStatus>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RescheduleOutcome {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
}

// ─── Patient booking ─────────────────────────────────────────────────────

/// Book a slot as a patient request (status REQUESTED).
///
/// Validation happens before any storage access; the conflict check and
/// insert share one immediate transaction. When an admin notify address is
/// configured, the outbox entry commits atomically with the appointment.
pub fn book_slot(
    conn: &mut Connection,
    request: &BookingRequest,
    config: &ScheduleConfig,
    now: i64,
) -> Result<Appointment, SchedulingError> {
    let name = request.patient_name.trim();
    if name.is_empty() {
        return Err(SchedulingError::validation("patient_name", "must not be empty"));
    }
    let email = request.contact_email.trim();
    if !EMAIL_PATTERN.is_match(email) {
        return Err(SchedulingError::validation(
            "contact_email",
            "is not a valid email address",
        ));
    }
    if !ALLOWED_DURATIONS.contains(&request.duration_minutes) {
        return Err(SchedulingError::validation(
            "duration_minutes",
            "must be one of 15, 30, 45 or 60",
        ));
    }
    if request.start_time <= now {
        return Err(SchedulingError::validation("start_time", "must be in the future"));
    }
    if !request.consent_given {
        return Err(SchedulingError::validation(
            "consent_given",
            "storing contact data requires consent",
        ));
    }
    let flagged = match review_notes(request.notes.as_deref()) {
        NotesVerdict::Rejected { reason } => {
            return Err(SchedulingError::Validation { field: "notes", reason })
        }
        verdict => verdict.is_flagged(),
    };

    let start_time = request.start_time;
    let end_time = start_time + request.duration_minutes * MS_PER_MINUTE;
    let phone = normalize(request.contact_phone.as_deref());
    let notes = normalize(request.notes.as_deref());

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;

    if has_conflicts(&tx, start_time, end_time, None)? {
        return Err(SchedulingError::SlotTaken { start_time, end_time });
    }

    let appointment = Appointment {
        id: Uuid::new_v4().to_string(),
        patient_name: name.to_string(),
        start_time,
        end_time,
        duration_minutes: request.duration_minutes,
        status: AppointmentStatus::Requested,
        series_id: None,
        contact_email: Some(email.to_string()),
        contact_phone: phone.clone(),
        notes: notes.clone(),
        flagged_notes: flagged,
        reminder_sent: false,
        created_at: now,
        updated_at: now,
    };
    insert_appointment(&tx, &appointment)?;

    if let Some(admin) = &config.admin_notify_email {
        let mut body = format!(
            "Neue Terminanfrage von {name}\nTermin: {} ({} Min)\nE-Mail: {email}",
            timezone::format_instant(start_time),
            request.duration_minutes,
        );
        if let Some(phone) = &phone {
            body.push_str(&format!("\nTelefon: {phone}"));
        }
        if let Some(notes) = &notes {
            body.push_str(&format!("\nHinweis: {notes}"));
        }
        enqueue_notification(&tx, admin, &format!("Neue Anfrage: {name}"), &body, now)?;
    }

    tx.commit().map_err(DatabaseError::from)?;
    tracing::info!("Recorded booking request {} for {}", appointment.id, name);
    Ok(appointment)
}

// ─── Admin creation ──────────────────────────────────────────────────────

/// Create an appointment on behalf of the practice. Past starts are
/// allowed here so sessions can be backfilled; the conflict check only
/// applies when the new row would actually occupy the calendar.
pub fn create_appointment(
    conn: &Connection,
    new: &NewAppointment,
    now: i64,
) -> Result<Appointment, SchedulingError> {
    let name = new.patient_name.trim();
    if name.is_empty() {
        return Err(SchedulingError::validation("patient_name", "must not be empty"));
    }
    if !ALLOWED_DURATIONS.contains(&new.duration_minutes) {
        return Err(SchedulingError::validation(
            "duration_minutes",
            "must be one of 15, 30, 45 or 60",
        ));
    }
    let email = optional_email(new.contact_email.as_deref())?;
    // The moderation rules guard the store, not the author.
    let flagged = match review_notes(new.notes.as_deref()) {
        NotesVerdict::Rejected { reason } => {
            return Err(SchedulingError::Validation { field: "notes", reason })
        }
        verdict => verdict.is_flagged(),
    };

    let status = new.status.clone().unwrap_or(AppointmentStatus::Confirmed);
    let start_time = new.start_time;
    let end_time = start_time + new.duration_minutes * MS_PER_MINUTE;

    if status.is_active() && has_conflicts(conn, start_time, end_time, None)? {
        return Err(SchedulingError::SlotTaken { start_time, end_time });
    }

    let appointment = Appointment {
        id: Uuid::new_v4().to_string(),
        patient_name: name.to_string(),
        start_time,
        end_time,
        duration_minutes: new.duration_minutes,
        status,
        series_id: None,
        contact_email: email,
        contact_phone: normalize(new.contact_phone.as_deref()),
        notes: normalize(new.notes.as_deref()),
        flagged_notes: flagged,
        reminder_sent: false,
        created_at: now,
        updated_at: now,
    };
    insert_appointment(conn, &appointment)?;
    tracing::info!("Created appointment {}", appointment.id);
    Ok(appointment)
}

// ─── Rescheduling ────────────────────────────────────────────────────────

/// Move an appointment to a new start.
///
/// `Single` moves just this row and fails with a conflict when the target
/// span is occupied. `Future` shifts this and every later member of the
/// same series by the civil-time delta, re-resolving each member through
/// the practice timezone; members whose target span is occupied keep
/// their old time and are reported as skipped.
pub fn reschedule_appointment(
    conn: &mut Connection,
    id: &str,
    new_start: i64,
    scope: EditScope,
    now: i64,
) -> Result<RescheduleOutcome, SchedulingError> {
    let anchor = get_appointment(conn, id)?;
    if !anchor.status.is_active() {
        return Err(SchedulingError::InvalidTransition {
            action: "reschedule",
            status: anchor.status,
        });
    }
    if new_start <= now {
        return Err(SchedulingError::validation("start_time", "must be in the future"));
    }

    match scope {
        EditScope::Single => {
            let new_end = new_start + anchor.duration_minutes * MS_PER_MINUTE;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(DatabaseError::from)?;
            if has_conflicts(&tx, new_start, new_end, Some(id))? {
                return Err(SchedulingError::SlotTaken {
                    start_time: new_start,
                    end_time: new_end,
                });
            }
            update_appointment_times(&tx, id, new_start, new_end, anchor.duration_minutes, now)?;
            tx.commit().map_err(DatabaseError::from)?;
            tracing::info!("Rescheduled appointment {id}");
            Ok(RescheduleOutcome {
                updated: vec![id.to_string()],
                skipped: Vec::new(),
            })
        }
        EditScope::Future => {
            let Some(series_id) = anchor.series_id.clone() else {
                // Not part of a series, so future collapses to single.
                return reschedule_appointment(conn, id, new_start, EditScope::Single, now);
            };
            let delta = civil_delta(anchor.start_time, new_start);
            let members = list_series_from(conn, &series_id, anchor.start_time)?;

            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(DatabaseError::from)?;
            let mut updated = Vec::new();
            let mut skipped = Vec::new();
            for member in &members {
                if !member.status.is_active() {
                    continue;
                }
                let Some(shifted) = shift_by_civil_delta(member.start_time, delta) else {
                    skipped.push(member.id.clone());
                    continue;
                };
                let shifted_end = shifted + member.duration_minutes * MS_PER_MINUTE;
                // Earlier moves in this loop are visible to this check.
                if has_conflicts(&tx, shifted, shifted_end, Some(&member.id))? {
                    skipped.push(member.id.clone());
                    continue;
                }
                update_appointment_times(
                    &tx,
                    &member.id,
                    shifted,
                    shifted_end,
                    member.duration_minutes,
                    now,
                )?;
                updated.push(member.id.clone());
            }
            tx.commit().map_err(DatabaseError::from)?;
            tracing::info!(
                "Rescheduled {} of {} series members, {} skipped",
                updated.len(),
                members.len(),
                skipped.len()
            );
            Ok(RescheduleOutcome { updated, skipped })
        }
    }
}

/// Wall-clock difference between two instants, in civil Berlin time.
fn civil_delta(from: i64, to: i64) -> Duration {
    let (from_date, from_time) = timezone::instant_to_civil(from);
    let (to_date, to_time) = timezone::instant_to_civil(to);
    NaiveDateTime::new(to_date, to_time) - NaiveDateTime::new(from_date, from_time)
}

/// Apply a civil delta to an instant and resolve the result back through
/// the practice timezone. None only on calendar overflow.
fn shift_by_civil_delta(instant: i64, delta: Duration) -> Option<i64> {
    let (date, time) = timezone::instant_to_civil(instant);
    let shifted = NaiveDateTime::new(date, time).checked_add_signed(delta)?;
    Some(timezone::civil_to_instant(shifted.date(), shifted.time()))
}

pub(crate) fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
