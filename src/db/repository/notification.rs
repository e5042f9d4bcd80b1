use std::str::FromStr;

use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::NotificationStatus;
use crate::models::Notification;

const NOTIFICATION_COLUMNS: &str =
    "id, recipient, subject, body, status, attempts, created_at, sent_at";

/// Queue a message for the external dispatcher. Returns the new row id.
pub fn enqueue_notification(
    conn: &Connection,
    recipient: &str,
    subject: &str,
    body: &str,
    now: i64,
) -> Result<String, DatabaseError> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO notification_outbox (id, recipient, subject, body, status, attempts, created_at)
         VALUES (?1, ?2, ?3, ?4, 'PENDING', 0, ?5)",
        params![id, recipient, subject, body, now],
    )?;
    Ok(id)
}

/// Oldest-first pending messages, up to `limit`.
pub fn list_pending_notifications(
    conn: &Connection,
    limit: i64,
) -> Result<Vec<Notification>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notification_outbox
         WHERE status = 'PENDING'
         ORDER BY created_at
         LIMIT ?1"
    ))?;
    let rows = stmt.query_map(params![limit], notification_row)?;

    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(notification_from_row(row?)?);
    }
    Ok(notifications)
}

pub fn mark_notification_sent(conn: &Connection, id: &str, now: i64) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE notification_outbox
         SET status = 'SENT', attempts = attempts + 1, sent_at = ?2
         WHERE id = ?1",
        params![id, now],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Notification".into(),
            id: id.into(),
        });
    }
    Ok(())
}

pub fn mark_notification_failed(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE notification_outbox
         SET status = 'FAILED', attempts = attempts + 1
         WHERE id = ?1",
        params![id],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Notification".into(),
            id: id.into(),
        });
    }
    Ok(())
}

/// Retention: drop SENT messages created before `cutoff`.
pub fn purge_sent_before(conn: &Connection, cutoff: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM notification_outbox WHERE status = 'SENT' AND created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

/// Retention: drop FAILED messages created before `cutoff`.
pub fn purge_failed_before(conn: &Connection, cutoff: i64) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM notification_outbox WHERE status = 'FAILED' AND created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

struct NotificationRow {
    id: String,
    recipient: String,
    subject: String,
    body: String,
    status: String,
    attempts: i64,
    created_at: i64,
    sent_at: Option<i64>,
}

fn notification_row(row: &rusqlite::Row<'_>) -> Result<NotificationRow, rusqlite::Error> {
    Ok(NotificationRow {
        id: row.get(0)?,
        recipient: row.get(1)?,
        subject: row.get(2)?,
        body: row.get(3)?,
        status: row.get(4)?,
        attempts: row.get(5)?,
        created_at: row.get(6)?,
        sent_at: row.get(7)?,
    })
}

fn notification_from_row(row: NotificationRow) -> Result<Notification, DatabaseError> {
    Ok(Notification {
        id: row.id,
        recipient: row.recipient,
        subject: row.subject,
        body: row.body,
        status: NotificationStatus::from_str(&row.status)?,
        attempts: row.attempts,
        created_at: row.created_at,
        sent_at: row.sent_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn enqueue_starts_pending_with_zero_attempts() {
        let conn = open_memory_database().unwrap();
        enqueue_notification(&conn, "praxis@example.com", "Neue Anfrage", "…", 1000).unwrap();

        let pending = list_pending_notifications(&conn, 10).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, NotificationStatus::Pending);
        assert_eq!(pending[0].attempts, 0);
        assert_eq!(pending[0].sent_at, None);
    }

    #[test]
    fn pending_listing_is_oldest_first_and_limited() {
        let conn = open_memory_database().unwrap();
        for (subject, at) in [("c", 3000), ("a", 1000), ("b", 2000)] {
            enqueue_notification(&conn, "x@example.com", subject, "…", at).unwrap();
        }

        let pending = list_pending_notifications(&conn, 2).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].subject, "a");
        assert_eq!(pending[1].subject, "b");
    }

    #[test]
    fn sent_and_failed_leave_pending_queue() {
        let conn = open_memory_database().unwrap();
        let id1 = enqueue_notification(&conn, "x@example.com", "s1", "…", 1000).unwrap();
        let id2 = enqueue_notification(&conn, "x@example.com", "s2", "…", 1000).unwrap();

        mark_notification_sent(&conn, &id1, 2000).unwrap();
        mark_notification_failed(&conn, &id2).unwrap();

        assert!(list_pending_notifications(&conn, 10).unwrap().is_empty());
    }

    #[test]
    fn retention_purges_by_status_and_age() {
        let conn = open_memory_database().unwrap();
        let old_sent = enqueue_notification(&conn, "x@example.com", "old", "…", 1000).unwrap();
        let new_sent = enqueue_notification(&conn, "x@example.com", "new", "…", 9000).unwrap();
        let old_failed = enqueue_notification(&conn, "x@example.com", "bad", "…", 1000).unwrap();
        mark_notification_sent(&conn, &old_sent, 1500).unwrap();
        mark_notification_sent(&conn, &new_sent, 9500).unwrap();
        mark_notification_failed(&conn, &old_failed).unwrap();

        assert_eq!(purge_sent_before(&conn, 5000).unwrap(), 1);
        assert_eq!(purge_failed_before(&conn, 5000).unwrap(), 1);
        assert_eq!(purge_sent_before(&conn, 5000).unwrap(), 0);
    }
}
