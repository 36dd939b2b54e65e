//! `steward-discord` — the event-dispatch core.
//!
//! [`handler::StewardHandler`] receives every gateway event and routes it
//! through a fixed, priority-ordered pipeline of subsystems with
//! per-event failure containment; [`adapter::Adapter`] owns the serenity
//! client and reconnect loop. Everything else here is a dispatcher
//! collaborator: command parsing, the built-in table, the debug gate, the
//! reaction role gate, presence, and outcome-typed sending.

pub mod adapter;
pub mod app;
pub mod builtins;
pub mod debug;
pub mod error;
pub mod gate;
pub mod handler;
pub mod parse;
pub mod presence;
pub mod send;

pub use adapter::Adapter;
pub use app::App;
pub use error::DiscordError;
