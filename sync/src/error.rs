//! Error types for the sync runtime.

/// Errors from caches, remote stores and the service built on them.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Engine error: {0}")]
    Engine(#[from] masterdata_engine::Error),

    #[error("Local cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Invalid remote URL: {0}")]
    InvalidUrl(String),

    #[error("Bundled dataset error: {0}")]
    Bundled(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the sync runtime.
pub type Result<T> = std::result::Result<T, SyncError>;
