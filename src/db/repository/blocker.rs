use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::Blocker;

const BLOCKER_COLUMNS: &str = "id, title, start_time, end_time, blocker_group_id, created_at";

pub fn insert_blocker(conn: &Connection, blocker: &Blocker) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO blockers (id, title, start_time, end_time, blocker_group_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            blocker.id,
            blocker.title,
            blocker.start_time,
            blocker.end_time,
            blocker.blocker_group_id,
            blocker.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_blocker(conn: &Connection, id: &str) -> Result<Blocker, DatabaseError> {
    conn.query_row(
        &format!("SELECT {BLOCKER_COLUMNS} FROM blockers WHERE id = ?1"),
        params![id],
        blocker_from_row,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
            entity_type: "Blocker".into(),
            id: id.into(),
        },
        other => DatabaseError::from(other),
    })
}

/// Blockers whose interval overlaps the half-open range `[start, end)`.
/// Every blocker is always active, so there is no status filter.
pub fn find_overlapping_blockers(
    conn: &Connection,
    start: i64,
    end: i64,
) -> Result<Vec<Blocker>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BLOCKER_COLUMNS} FROM blockers
         WHERE start_time < ?2 AND end_time > ?1
         ORDER BY start_time"
    ))?;
    let rows = stmt.query_map(params![start, end], blocker_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

/// Members of a blocker group, ordered by start.
pub fn list_blocker_group(conn: &Connection, group_id: &str) -> Result<Vec<Blocker>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BLOCKER_COLUMNS} FROM blockers
         WHERE blocker_group_id = ?1
         ORDER BY start_time"
    ))?;
    let rows = stmt.query_map(params![group_id], blocker_from_row)?;
    rows.map(|r| r.map_err(DatabaseError::from)).collect()
}

pub fn delete_blocker(conn: &Connection, id: &str) -> Result<(), DatabaseError> {
    let changed = conn.execute("DELETE FROM blockers WHERE id = ?1", params![id])?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Blocker".into(),
            id: id.into(),
        });
    }
    Ok(())
}

/// Delete every member of a blocker group. Returns the number removed.
pub fn delete_blocker_group(conn: &Connection, group_id: &str) -> Result<usize, DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM blockers WHERE blocker_group_id = ?1",
        params![group_id],
    )?;
    Ok(deleted)
}

fn blocker_from_row(row: &rusqlite::Row<'_>) -> Result<Blocker, rusqlite::Error> {
    Ok(Blocker {
        id: row.get(0)?,
        title: row.get(1)?,
        start_time: row.get(2)?,
        end_time: row.get(3)?,
        blocker_group_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}
