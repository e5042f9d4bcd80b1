use std::collections::HashMap;

use rusqlite::{params, Connection};

use crate::db::DatabaseError;

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>, DatabaseError> {
    match conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get::<_, String>(0),
    ) {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

pub fn all_settings(conn: &Connection) -> Result<HashMap<String, String>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut settings = HashMap::new();
    for row in rows {
        let (key, value) = row?;
        settings.insert(key, value);
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn missing_key_is_none() {
        let conn = open_memory_database().unwrap();
        assert_eq!(get_setting(&conn, "slotDuration").unwrap(), None);
    }

    #[test]
    fn set_then_get_round_trip() {
        let conn = open_memory_database().unwrap();
        set_setting(&conn, "slotDuration", "45").unwrap();
        assert_eq!(get_setting(&conn, "slotDuration").unwrap().as_deref(), Some("45"));
    }

    #[test]
    fn set_overwrites_existing_value() {
        let conn = open_memory_database().unwrap();
        set_setting(&conn, "morningStart", "08:00").unwrap();
        set_setting(&conn, "morningStart", "09:00").unwrap();
        assert_eq!(get_setting(&conn, "morningStart").unwrap().as_deref(), Some("09:00"));
        assert_eq!(all_settings(&conn).unwrap().len(), 1);
    }
}
