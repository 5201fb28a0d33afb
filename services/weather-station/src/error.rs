//! Error types for the weather station service

/// Errors that can occur in the weather station service
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl From<rusqlite::Error> for StationError {
    fn from(e: rusqlite::Error) -> Self {
        StationError::Persistence(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StationError {
    fn from(e: tokio::task::JoinError) -> Self {
        StationError::Task(e.to_string())
    }
}

/// Result type alias for weather station operations
pub type Result<T> = std::result::Result<T, StationError>;
