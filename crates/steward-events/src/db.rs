use rusqlite::Connection;

use crate::error::Result;

/// Initialise the events schema in `conn`. Idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS event_entries (
            channel_id  INTEGER NOT NULL,
            author_id   INTEGER NOT NULL,
            posted_at   TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_event_entries_author
            ON event_entries (author_id);
        ",
    )?;
    Ok(())
}

pub fn record_entry(
    conn: &Connection,
    channel_id: u64,
    author_id: u64,
    posted_at: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO event_entries (channel_id, author_id, posted_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![channel_id as i64, author_id as i64, posted_at],
    )?;
    Ok(())
}

pub fn entry_count(conn: &Connection, author_id: u64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM event_entries WHERE author_id = ?1",
        [author_id as i64],
        |row| row.get(0),
    )?;
    Ok(count)
}
