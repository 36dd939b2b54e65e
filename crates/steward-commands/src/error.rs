use thiserror::Error;

/// Custom-command store errors. `ReservedName` is surfaced to the
/// requesting user; the rest are contained by the dispatcher.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("'{name}' is a built-in command name")]
    ReservedName { name: String },

    #[error("No custom command named '{name}'")]
    NotFound { name: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
