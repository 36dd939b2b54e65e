use rusqlite::Connection;

use crate::error::Result;

/// A weekly game session: announced every `day` (0 = Monday … 6 = Sunday)
/// at `hour`:`minute` UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledGame {
    pub id: String,
    pub name: String,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    /// RFC 3339 instant of the occurrence most recently announced (or
    /// skipped at creation time), if any.
    pub last_announced: Option<String>,
}

/// Initialise the games schema in `conn`. Idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS games (
            id              TEXT    NOT NULL PRIMARY KEY,
            name            TEXT    NOT NULL,
            day             INTEGER NOT NULL,
            hour            INTEGER NOT NULL,
            minute          INTEGER NOT NULL,
            last_announced  TEXT,
            created_at      TEXT    NOT NULL
        ) STRICT;
        ",
    )?;
    Ok(())
}

pub fn insert(conn: &Connection, game: &ScheduledGame, created_at: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO games (id, name, day, hour, minute, last_announced, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            game.id,
            game.name,
            game.day,
            game.hour,
            game.minute,
            game.last_announced,
            created_at
        ],
    )?;
    Ok(())
}

pub fn all(conn: &Connection) -> Result<Vec<ScheduledGame>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, day, hour, minute, last_announced
         FROM games ORDER BY day, hour, minute",
    )?;
    let games = stmt
        .query_map([], |row| {
            Ok(ScheduledGame {
                id: row.get(0)?,
                name: row.get(1)?,
                day: row.get(2)?,
                hour: row.get(3)?,
                minute: row.get(4)?,
                last_announced: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(games)
}

pub fn mark_announced(conn: &Connection, id: &str, occurrence: &str) -> Result<()> {
    conn.execute(
        "UPDATE games SET last_announced = ?1 WHERE id = ?2",
        [occurrence, id],
    )?;
    Ok(())
}

/// Returns the number of games removed.
pub fn clear(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM games", [])?)
}
