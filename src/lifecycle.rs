//! Appointment lifecycle transitions.
//!
//! REQUESTED is the only state the public booking path can create.
//! Confirm and reject act on requests, cancel acts on confirmed
//! appointments, and the sweep expires stale requests in bulk.
//! CANCELLED and EXPIRED are terminal. Repeating an action that already
//! happened is a no-op success; any other departure from the table is an
//! invalid transition. Patient notifications go out only when a request
//! is decided (confirmed or rejected), in the same transaction as the
//! status change, so an idempotent no-op can never enqueue a duplicate.

use rusqlite::{Connection, TransactionBehavior};

use crate::db::repository::{
    enqueue_notification, expire_requested_before, get_appointment, update_appointment_status,
};
use crate::db::DatabaseError;
use crate::error::SchedulingError;
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;
use crate::timezone::{self, MS_PER_MINUTE};

const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// REQUESTED → CONFIRMED. Re-confirming is a no-op success.
pub fn confirm_request(
    conn: &mut Connection,
    id: &str,
    now: i64,
) -> Result<Appointment, SchedulingError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;
    let appointment = get_appointment(&tx, id)?;

    match appointment.status.clone() {
        AppointmentStatus::Confirmed => {
            drop(tx);
            Ok(appointment)
        }
        AppointmentStatus::Requested => {
            update_appointment_status(&tx, id, &AppointmentStatus::Confirmed, now)?;
            if let Some(email) = &appointment.contact_email {
                enqueue_notification(
                    &tx,
                    email,
                    "Terminbestätigung",
                    &format!(
                        "Guten Tag {},\n\nIhr Termin am {} ist bestätigt.\n\nIhre Praxis",
                        appointment.patient_name,
                        timezone::format_instant(appointment.start_time),
                    ),
                    now,
                )?;
            }
            tx.commit().map_err(DatabaseError::from)?;
            tracing::info!("Confirmed appointment {id}");
            Ok(Appointment {
                status: AppointmentStatus::Confirmed,
                updated_at: now,
                ..appointment
            })
        }
        status => Err(SchedulingError::InvalidTransition { action: "confirm", status }),
    }
}

/// REQUESTED → CANCELLED. Rejecting twice is a no-op success; rejecting
/// a CONFIRMED appointment is refused (that is what cancel is for).
pub fn reject_request(
    conn: &mut Connection,
    id: &str,
    now: i64,
) -> Result<Appointment, SchedulingError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;
    let appointment = get_appointment(&tx, id)?;

    match appointment.status.clone() {
        AppointmentStatus::Cancelled => {
            drop(tx);
            Ok(appointment)
        }
        AppointmentStatus::Requested => {
            update_appointment_status(&tx, id, &AppointmentStatus::Cancelled, now)?;
            if let Some(email) = &appointment.contact_email {
                enqueue_notification(
                    &tx,
                    email,
                    "Ihre Terminanfrage",
                    &format!(
                        "Guten Tag {},\n\nIhr Terminwunsch am {} kann leider nicht \
                         stattfinden. Bitte wählen Sie einen anderen Termin.\n\nIhre Praxis",
                        appointment.patient_name,
                        timezone::format_instant(appointment.start_time),
                    ),
                    now,
                )?;
            }
            tx.commit().map_err(DatabaseError::from)?;
            tracing::info!("Rejected request {id}");
            Ok(Appointment {
                status: AppointmentStatus::Cancelled,
                updated_at: now,
                ..appointment
            })
        }
        status => Err(SchedulingError::InvalidTransition { action: "reject", status }),
    }
}

/// CONFIRMED → CANCELLED. Cancelling twice is a no-op success;
/// cancelling a still-REQUESTED appointment is refused.
pub fn cancel_appointment(
    conn: &mut Connection,
    id: &str,
    now: i64,
) -> Result<Appointment, SchedulingError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;
    let appointment = get_appointment(&tx, id)?;

    match appointment.status.clone() {
        AppointmentStatus::Cancelled => {
            drop(tx);
            Ok(appointment)
        }
        AppointmentStatus::Confirmed => {
            update_appointment_status(&tx, id, &AppointmentStatus::Cancelled, now)?;
            tx.commit().map_err(DatabaseError::from)?;
            tracing::info!("Cancelled appointment {id}");
            Ok(Appointment {
                status: AppointmentStatus::Cancelled,
                updated_at: now,
                ..appointment
            })
        }
        status => Err(SchedulingError::InvalidTransition { action: "cancel", status }),
    }
}

/// Bulk REQUESTED → EXPIRED for requests older than `timeout_hours`.
/// Returns the number of rows transitioned. No notifications.
pub fn expire_stale_requests(
    conn: &Connection,
    timeout_hours: i64,
    now: i64,
) -> Result<usize, SchedulingError> {
    let cutoff = now - timeout_hours * MS_PER_HOUR;
    let expired = expire_requested_before(conn, cutoff, now)?;
    if expired > 0 {
        tracing::info!("Expired {expired} stale requests");
    }
    Ok(expired)
}
