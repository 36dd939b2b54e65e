use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

/// A member's durable XP counters as stored in SQLite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpRow {
    pub xp: i64,
    pub monthly_xp: i64,
    /// "%Y-%m" key the monthly counter belongs to.
    pub month: String,
}

/// Initialise the tracker schema in `conn`. Idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS xp (
            user_id     INTEGER NOT NULL PRIMARY KEY,
            xp          INTEGER NOT NULL DEFAULT 0,
            monthly_xp  INTEGER NOT NULL DEFAULT 0,
            month       TEXT    NOT NULL DEFAULT ''
        ) STRICT;

        -- Leaderboard query: SELECT … ORDER BY xp DESC LIMIT ?
        CREATE INDEX IF NOT EXISTS idx_xp_total ON xp (xp DESC);
        ",
    )?;
    Ok(())
}

pub fn get(conn: &Connection, user_id: u64) -> Result<Option<XpRow>> {
    let row = conn
        .query_row(
            "SELECT xp, monthly_xp, month FROM xp WHERE user_id = ?1",
            [user_id as i64],
            |row| {
                Ok(XpRow {
                    xp: row.get(0)?,
                    monthly_xp: row.get(1)?,
                    month: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn upsert(conn: &Connection, user_id: u64, row: &XpRow) -> Result<()> {
    conn.execute(
        "INSERT INTO xp (user_id, xp, monthly_xp, month)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(user_id) DO UPDATE SET
             xp = excluded.xp,
             monthly_xp = excluded.monthly_xp,
             month = excluded.month",
        rusqlite::params![user_id as i64, row.xp, row.monthly_xp, row.month],
    )?;
    Ok(())
}

/// Top `limit` members by total XP, descending.
pub fn top(conn: &Connection, limit: usize) -> Result<Vec<(u64, i64)>> {
    let mut stmt =
        conn.prepare("SELECT user_id, xp FROM xp ORDER BY xp DESC, user_id LIMIT ?1")?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        conn
    }

    #[test]
    fn get_missing_member_is_none() {
        let conn = conn();
        assert!(get(&conn, 42).unwrap().is_none());
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let conn = conn();
        let row = XpRow {
            xp: 300,
            monthly_xp: 120,
            month: "2026-08".to_string(),
        };
        upsert(&conn, 42, &row).unwrap();
        assert_eq!(get(&conn, 42).unwrap(), Some(row.clone()));

        // Second upsert replaces, never duplicates.
        let updated = XpRow { xp: 315, ..row };
        upsert(&conn, 42, &updated).unwrap();
        assert_eq!(get(&conn, 42).unwrap(), Some(updated));
    }

    #[test]
    fn top_orders_by_xp_descending() {
        let conn = conn();
        for (id, xp) in [(1u64, 50i64), (2, 500), (3, 200)] {
            upsert(
                &conn,
                id,
                &XpRow {
                    xp,
                    monthly_xp: 0,
                    month: String::new(),
                },
            )
            .unwrap();
        }
        let rows = top(&conn, 2).unwrap();
        assert_eq!(rows, vec![(2, 500), (3, 200)]);
    }
}
