//! `steward-tracker` — per-member XP accounting.
//!
//! SQLite holds the durable counters; a dashmap cache in front of the
//! connection keeps the per-message hot path (cooldown check + award) off
//! the database lock. Cache entries are evicted when a member leaves and
//! lazily reloaded on their next message.

pub mod db;
pub mod error;
pub mod level;
pub mod tracker;

pub use error::{Result, TrackerError};
pub use tracker::{LeaderboardEntry, MemberStats, Tracker};
