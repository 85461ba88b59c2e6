use thiserror::Error;

use crate::database::StoreError;

#[derive(Error, Debug)]
pub enum IndexerError {
    /// Passed through untouched from the entity store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Unknown handler: {0}")]
    UnknownHandler(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// Implement From for ConfigError to IndexerError
impl From<crate::config::ConfigError> for IndexerError {
    fn from(error: crate::config::ConfigError) -> Self {
        IndexerError::ConfigError(format!("{}", error))
    }
}

impl From<serde_json::Error> for IndexerError {
    fn from(error: serde_json::Error) -> Self {
        IndexerError::SerializationError(format!("{}", error))
    }
}

pub type Result<T, E = IndexerError> = std::result::Result<T, E>;
