use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use rusqlite::Connection;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{self, ScheduledGame};
use crate::error::{GamesError, Result};

/// A due game announcement, ready to post to the announcement channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub text: String,
}

/// Shared handle for game management (add/list/clear) while the engine
/// loop runs. Uses its own `Connection` so the built-in commands never
/// conflict with the engine's polling queries.
pub struct GamesHandle {
    conn: Arc<Mutex<Connection>>,
}

impl GamesHandle {
    pub fn new(conn: Connection) -> Result<Self> {
        db::init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Schedule a weekly game. The current occurrence is stamped as
    /// already announced so the first announcement lands on the *next*
    /// occurrence, not retroactively.
    pub fn add_game(&self, name: &str, day: u8, hour: u8, minute: u8) -> Result<ScheduledGame> {
        if day > 6 || hour > 23 || minute > 59 {
            return Err(GamesError::InvalidSchedule(format!(
                "day {day}, {hour:02}:{minute:02}"
            )));
        }
        let now = Utc::now();
        let game = ScheduledGame {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            day,
            hour,
            minute,
            last_announced: latest_occurrence(now, day, hour, minute).map(|t| t.to_rfc3339()),
        };
        let conn = self.conn.lock().unwrap();
        db::insert(&conn, &game, &now.to_rfc3339())?;
        info!(name, day, hour, minute, "game scheduled");
        Ok(game)
    }

    pub fn list_games(&self) -> Result<Vec<ScheduledGame>> {
        let conn = self.conn.lock().unwrap();
        db::all(&conn)
    }

    pub fn clear_games(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let n = db::clear(&conn)?;
        info!(count = n, "games cleared");
        Ok(n)
    }
}

/// Polling engine: emits due announcements over mpsc. Owns its own
/// `Connection` and is consumed by [`GameTimer::run`].
pub struct GameTimer {
    conn: Connection,
    poll: Duration,
}

impl GameTimer {
    pub fn new(conn: Connection, poll_secs: u64) -> Result<Self> {
        db::init_db(&conn)?;
        Ok(Self {
            conn,
            poll: Duration::from_secs(poll_secs),
        })
    }

    /// Poll until the receiving side goes away.
    pub async fn run(self, tx: mpsc::Sender<Announcement>) {
        let mut ticker = tokio::time::interval(self.poll);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.due_announcements(Utc::now()) {
                Ok(due) => {
                    for announcement in due {
                        if tx.send(announcement).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => warn!(error = %e, "game poll failed"),
            }
        }
    }

    /// Collect games whose latest weekly occurrence has not been announced
    /// yet, marking each as announced for that occurrence. Missed
    /// occurrences (engine offline) collapse into one announcement.
    fn due_announcements(&self, now: DateTime<Utc>) -> Result<Vec<Announcement>> {
        let mut due = Vec::new();
        for game in db::all(&self.conn)? {
            let Some(occurrence) = latest_occurrence(now, game.day, game.hour, game.minute)
            else {
                continue;
            };
            let announced = game
                .last_announced
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc));
            if announced.is_some_and(|t| t >= occurrence) {
                continue;
            }
            db::mark_announced(&self.conn, &game.id, &occurrence.to_rfc3339())?;
            due.push(Announcement {
                text: format!("\u{1f3ae} **{}** is starting now!", game.name),
            });
        }
        Ok(due)
    }
}

/// The most recent instant at or before `now` that falls on the given
/// weekday (0 = Monday … 6 = Sunday) at `hour`:`minute` UTC.
fn latest_occurrence(now: DateTime<Utc>, day: u8, hour: u8, minute: u8) -> Option<DateTime<Utc>> {
    let days_back = (now.weekday().num_days_from_monday() as i64 - day as i64).rem_euclid(7);
    let date = now - chrono::Duration::days(days_back);
    let candidate = Utc
        .with_ymd_and_hms(
            date.year(),
            date.month(),
            date.day(),
            hour as u32,
            minute as u32,
            0,
        )
        .single()?;
    if candidate > now {
        Some(candidate - chrono::Duration::days(7))
    } else {
        Some(candidate)
    }
}

/// Parse a weekday token from a command ("mon", "monday", "0"…"6").
pub fn parse_weekday(token: &str) -> Option<u8> {
    let lower = token.to_lowercase();
    let day = match lower.as_str() {
        "mon" | "monday" | "0" => 0,
        "tue" | "tuesday" | "1" => 1,
        "wed" | "wednesday" | "2" => 2,
        "thu" | "thursday" | "3" => 3,
        "fri" | "friday" | "4" => 4,
        "sat" | "saturday" | "5" => 5,
        "sun" | "sunday" | "6" => 6,
        _ => return None,
    };
    Some(day)
}

pub fn weekday_name(day: u8) -> &'static str {
    match day {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        _ => "Sunday",
    }
}
