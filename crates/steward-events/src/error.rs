use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, EventsError>;
