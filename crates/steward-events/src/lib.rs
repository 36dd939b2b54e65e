//! `steward-events` — timed community events.
//!
//! Messages posted in the configured event channel count as entries; a
//! reaction with the prize emoji in that channel marks the reacted
//! message's author for a prize. This crate only decides applicability
//! and records participation — the dispatcher routes the actual XP award
//! through the tracker.

pub mod db;
pub mod error;

pub use error::{EventsError, Result};

use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use steward_core::config::EventsConfig;
use tracing::debug;

pub struct EventManager {
    db: Arc<Mutex<Connection>>,
    config: EventsConfig,
}

impl EventManager {
    pub fn new(db: Arc<Mutex<Connection>>, config: EventsConfig) -> Result<Self> {
        {
            let conn = db.lock().unwrap();
            db::init_db(&conn)?;
        }
        Ok(Self { db, config })
    }

    pub fn is_event_channel(&self, channel_id: u64) -> bool {
        self.config.channel == Some(channel_id)
    }

    /// Fallback check for non-command messages: record an entry when the
    /// message participates in a live event channel.
    pub fn on_message(&self, channel_id: u64, author_id: u64) -> Result<()> {
        if !self.is_event_channel(channel_id) {
            return Ok(());
        }
        let conn = self.db.lock().unwrap();
        db::record_entry(&conn, channel_id, author_id, &Utc::now().to_rfc3339())?;
        debug!(channel_id, author_id, "event entry recorded");
        Ok(())
    }

    /// Prize applicability for a reaction: the configured prize XP when
    /// the reaction is the prize emoji on a message in the event channel.
    pub fn prize_for(&self, channel_id: u64, emoji: &str) -> Option<i64> {
        if self.is_event_channel(channel_id) && emoji == self.config.prize_emoji {
            Some(self.config.prize_xp)
        } else {
            None
        }
    }

    /// Lifetime entry count for a member, shown in `userinfo`.
    pub fn entries(&self, author_id: u64) -> Result<i64> {
        let conn = self.db.lock().unwrap();
        db::entry_count(&conn, author_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(channel: Option<u64>) -> EventManager {
        let conn = Connection::open_in_memory().unwrap();
        EventManager::new(
            Arc::new(Mutex::new(conn)),
            EventsConfig {
                channel,
                prize_emoji: "\u{1f3c6}".to_string(),
                prize_xp: 100,
            },
        )
        .unwrap()
    }

    #[test]
    fn entries_only_count_in_the_event_channel() {
        let ev = manager(Some(10));
        ev.on_message(10, 1).unwrap();
        ev.on_message(10, 1).unwrap();
        ev.on_message(99, 1).unwrap();
        assert_eq!(ev.entries(1).unwrap(), 2);
        assert_eq!(ev.entries(2).unwrap(), 0);
    }

    #[test]
    fn no_event_channel_configured_records_nothing() {
        let ev = manager(None);
        ev.on_message(10, 1).unwrap();
        assert_eq!(ev.entries(1).unwrap(), 0);
    }

    #[test]
    fn prize_requires_channel_and_emoji() {
        let ev = manager(Some(10));
        assert_eq!(ev.prize_for(10, "\u{1f3c6}"), Some(100));
        assert_eq!(ev.prize_for(10, "\u{1f389}"), None);
        assert_eq!(ev.prize_for(11, "\u{1f3c6}"), None);
    }
}
