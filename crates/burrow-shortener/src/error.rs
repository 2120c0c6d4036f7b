use burrow_core::{CoreError, StorageError};
use thiserror::Error;

/// Result type for shortener operations.
pub type Result<T> = std::result::Result<T, ShortenerError>;

#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid owner id: {0}")]
    InvalidOwner(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("no free short code found after {attempts} attempts")]
    CodeExhaustion { attempts: u32 },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidShortCode(message),
            CoreError::InvalidUrl(message) => Self::InvalidUrl(message),
            CoreError::InvalidOwner(message) => Self::InvalidOwner(message),
        }
    }
}
