use thiserror::Error;

pub type Result<T> = std::result::Result<T, TestInfraError>;

/// Failures while starting or probing a test container.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("failed to start container: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("redis client error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The container started but never answered `PING`.
    #[error("redis not ready after {attempts} attempts")]
    NotReady { attempts: u32 },
}
