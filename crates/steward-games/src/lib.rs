//! `steward-games` — weekly game-session announcements.
//!
//! Games are persisted to a SQLite `games` table. The [`timer::GameTimer`]
//! engine polls the table and emits an [`timer::Announcement`] over mpsc
//! whenever a game's weekly occurrence arrives, at most once per
//! occurrence; the Discord adapter forwards announcements to the
//! configured channel. The [`timer::GamesHandle`] side serves the
//! management commands while the engine loop runs.

pub mod db;
pub mod error;
pub mod timer;

pub use db::ScheduledGame;
pub use error::{GamesError, Result};
pub use timer::{Announcement, GameTimer, GamesHandle};
