use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// Initialise the custom-command schema in `conn`. Idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS custom_commands (
            name      TEXT NOT NULL PRIMARY KEY,
            response  TEXT NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}

pub fn get(conn: &Connection, name: &str) -> Result<Option<String>> {
    let response = conn
        .query_row(
            "SELECT response FROM custom_commands WHERE name = ?1",
            [name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(response)
}

pub fn put(conn: &Connection, name: &str, response: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO custom_commands (name, response) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET response = excluded.response",
        [name, response],
    )?;
    Ok(())
}

/// Returns true when a row was deleted.
pub fn delete(conn: &Connection, name: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM custom_commands WHERE name = ?1", [name])?;
    Ok(n > 0)
}

pub fn names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM custom_commands ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}
