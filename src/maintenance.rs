//! Periodic maintenance sweep.
//!
//! One entry point for the external scheduler: expire stale requests,
//! queue 24-hour reminders, apply retention. Every task is idempotent
//! within its period, so running the sweep twice in a row changes
//! nothing the second time.

use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::config::ScheduleConfig;
use crate::db::repository::{
    delete_confirmed_ended_before, delete_terminal_created_before, enqueue_notification,
    list_needing_reminder, mark_reminder_sent, purge_failed_before, purge_sent_before,
};
use crate::db::DatabaseError;
use crate::error::SchedulingError;
use crate::lifecycle::expire_stale_requests;
use crate::timezone::{self, MS_PER_DAY};

/// Outbox rows that were delivered are kept 30 days for audit.
const SENT_RETENTION_DAYS: i64 = 30;
/// Failed rows stay longer so delivery problems can be diagnosed.
const FAILED_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub expired: usize,
    pub reminders_queued: usize,
    pub terminal_purged: usize,
    pub past_purged: usize,
    pub outbox_purged: usize,
}

/// Run every maintenance task once.
pub fn run_sweep(
    conn: &mut Connection,
    config: &ScheduleConfig,
    now: i64,
) -> Result<SweepReport, SchedulingError> {
    let expired = expire_stale_requests(conn, config.request_timeout_hours, now)?;

    let reminders_queued = if config.reminders_enabled {
        queue_reminders(conn, now)?
    } else {
        0
    };

    let terminal_purged =
        delete_terminal_created_before(conn, now - config.retention_days_expired * MS_PER_DAY)?;
    let past_purged =
        delete_confirmed_ended_before(conn, now - config.retention_days_past * MS_PER_DAY)?;
    let outbox_purged = purge_sent_before(conn, now - SENT_RETENTION_DAYS * MS_PER_DAY)?
        + purge_failed_before(conn, now - FAILED_RETENTION_DAYS * MS_PER_DAY)?;

    let report = SweepReport {
        expired,
        reminders_queued,
        terminal_purged,
        past_purged,
        outbox_purged,
    };
    tracing::info!(
        "Sweep: {} expired, {} reminders, {} rows purged",
        report.expired,
        report.reminders_queued,
        report.terminal_purged + report.past_purged + report.outbox_purged
    );
    Ok(report)
}

/// Queue a reminder for every CONFIRMED appointment with a contact email
/// starting within the next 24 hours. The enqueue and the `reminder_sent`
/// mark commit together, so a crash cannot leave a reminder that repeats.
fn queue_reminders(conn: &mut Connection, now: i64) -> Result<usize, SchedulingError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DatabaseError::from)?;

    let due = list_needing_reminder(&tx, now, now + MS_PER_DAY)?;
    let mut queued = 0;
    for appointment in &due {
        let Some(email) = &appointment.contact_email else {
            continue;
        };
        enqueue_notification(
            &tx,
            email,
            "Terminerinnerung",
            &format!(
                "Guten Tag {},\n\nwir erinnern an Ihren Termin am {}.\n\nIhre Praxis",
                appointment.patient_name,
                timezone::format_instant(appointment.start_time),
            ),
            now,
        )?;
        mark_reminder_sent(&tx, &appointment.id, now)?;
        queued += 1;
    }
    tx.commit().map_err(DatabaseError::from)?;

    Ok(queued)
}
