//! `steward-core` — configuration and shared error type.

pub mod config;
pub mod error;

pub use config::StewardConfig;
pub use error::{CoreError, Result};
