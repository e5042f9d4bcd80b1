use std::str::FromStr;

use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;

const APPOINTMENT_COLUMNS: &str = "id, patient_name, start_time, end_time, duration_minutes, \
     status, series_id, contact_email, contact_phone, notes, flagged_notes, reminder_sent, \
     created_at, updated_at";

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_name, start_time, end_time, duration_minutes,
         status, series_id, contact_email, contact_phone, notes, flagged_notes, reminder_sent,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            appt.id,
            appt.patient_name,
            appt.start_time,
            appt.end_time,
            appt.duration_minutes,
            appt.status.as_str(),
            appt.series_id,
            appt.contact_email,
            appt.contact_phone,
            appt.notes,
            appt.flagged_notes as i32,
            appt.reminder_sent as i32,
            appt.created_at,
            appt.updated_at,
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &str) -> Result<Appointment, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id],
            appointment_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "Appointment".into(),
                id: id.into(),
            },
            other => DatabaseError::from(other),
        })?;
    appointment_from_row(row)
}

/// Active appointments (REQUESTED or CONFIRMED) whose interval overlaps
/// the half-open range `[start, end)`. `exclude_id` lets a reschedule
/// ignore its own prior interval.
pub fn find_overlapping_active(
    conn: &Connection,
    start: i64,
    end: i64,
    exclude_id: Option<&str>,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE status IN ('CONFIRMED', 'REQUESTED')
           AND start_time < ?2 AND end_time > ?1"
    );
    if exclude_id.is_some() {
        sql.push_str(" AND id != ?3");
    }
    sql.push_str(" ORDER BY start_time");

    let mut stmt = conn.prepare(&sql)?;
    let rows = match exclude_id {
        Some(ex) => stmt.query_map(params![start, end, ex], appointment_row)?,
        None => stmt.query_map(params![start, end], appointment_row)?,
    };

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row?)?);
    }
    Ok(appts)
}

/// Appointments of any status overlapping `[from, to)`, ordered by start.
pub fn list_appointments_in_range(
    conn: &Connection,
    from: i64,
    to: i64,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE start_time < ?2 AND end_time > ?1
         ORDER BY start_time"
    ))?;
    let rows = stmt.query_map(params![from, to], appointment_row)?;

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row?)?);
    }
    Ok(appts)
}

/// Members of a series starting at or after `from_start`, ordered by start.
pub fn list_series_from(
    conn: &Connection,
    series_id: &str,
    from_start: i64,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE series_id = ?1 AND start_time >= ?2
         ORDER BY start_time"
    ))?;
    let rows = stmt.query_map(params![series_id, from_start], appointment_row)?;

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row?)?);
    }
    Ok(appts)
}

pub fn update_appointment_times(
    conn: &Connection,
    id: &str,
    start_time: i64,
    end_time: i64,
    duration_minutes: i64,
    updated_at: i64,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments
         SET start_time = ?2, end_time = ?3, duration_minutes = ?4, updated_at = ?5
         WHERE id = ?1",
        params![id, start_time, end_time, duration_minutes, updated_at],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.into(),
        });
    }
    Ok(())
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: &AppointmentStatus,
    updated_at: i64,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status.as_str(), updated_at],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.into(),
        });
    }
    Ok(())
}

pub fn mark_reminder_sent(conn: &Connection, id: &str, updated_at: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET reminder_sent = 1, updated_at = ?2 WHERE id = ?1",
        params![id, updated_at],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.into(),
        });
    }
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.into(),
        });
    }
    Ok(())
}

/// Delete every member of a series. Returns the number of rows removed.
pub fn delete_appointment_series(conn: &Connection, series_id: &str) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM appointments WHERE series_id = ?1",
        params![series_id],
    )?;
    Ok(deleted)
}

/// Bulk REQUESTED → EXPIRED for requests created before `cutoff`.
/// Returns the number of rows transitioned.
pub fn expire_requested_before(
    conn: &Connection,
    cutoff: i64,
    now: i64,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = 'EXPIRED', updated_at = ?2
         WHERE status = 'REQUESTED' AND created_at < ?1",
        params![cutoff, now],
    )?;
    Ok(changed)
}

/// Retention: drop CANCELLED/EXPIRED rows created before `cutoff`.
pub fn delete_terminal_created_before(conn: &Connection, cutoff: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM appointments
         WHERE status IN ('CANCELLED', 'EXPIRED') AND created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

/// Retention: drop CONFIRMED rows whose interval ended before `cutoff`.
pub fn delete_confirmed_ended_before(conn: &Connection, cutoff: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM appointments WHERE status = 'CONFIRMED' AND end_time < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

/// CONFIRMED appointments starting inside `[from, to)` that have a contact
/// email and no reminder yet.
pub fn list_needing_reminder(
    conn: &Connection,
    from: i64,
    to: i64,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE status = 'CONFIRMED'
           AND reminder_sent = 0
           AND contact_email IS NOT NULL
           AND start_time >= ?1 AND start_time < ?2
         ORDER BY start_time"
    ))?;
    let rows = stmt.query_map(params![from, to], appointment_row)?;

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row?)?);
    }
    Ok(appts)
}

// Internal row type: status stays a raw string until parsed.
struct AppointmentRow {
    id: String,
    patient_name: String,
    start_time: i64,
    end_time: i64,
    duration_minutes: i64,
    status: String,
    series_id: Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    notes: Option<String>,
    flagged_notes: i32,
    reminder_sent: i32,
    created_at: i64,
    updated_at: i64,
}

fn appointment_row(row: &rusqlite::Row<'_>) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_name: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        duration_minutes: row.get(4)?,
        status: row.get(5)?,
        series_id: row.get(6)?,
        contact_email: row.get(7)?,
        contact_phone: row.get(8)?,
        notes: row.get(9)?,
        flagged_notes: row.get(10)?,
        reminder_sent: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: row.id,
        patient_name: row.patient_name,
        start_time: row.start_time,
        end_time: row.end_time,
        duration_minutes: row.duration_minutes,
        status: AppointmentStatus::from_str(&row.status)?,
        series_id: row.series_id,
        contact_email: row.contact_email,
        contact_phone: row.contact_phone,
        notes: row.notes,
        flagged_notes: row.flagged_notes != 0,
        reminder_sent: row.reminder_sent != 0,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}
