pub use burrow_core::StorageError;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

pub(crate) fn map_redis_error(operation: &str, err: redis::RedisError) -> StorageError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        StorageError::Timeout(message)
    } else {
        StorageError::Query(message)
    }
}
