use thiserror::Error;

#[derive(Debug, Error)]
pub enum GamesError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}

pub type Result<T> = std::result::Result<T, GamesError>;
