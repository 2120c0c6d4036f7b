use crate::{Result, TestInfraError};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use typed_builder::TypedBuilder;

/// Settings for a disposable Redis server.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisServerConfig {
    #[builder(default = "redis".to_string(), setter(into))]
    image: String,
    #[builder(default = "8.6.0".to_string(), setter(into))]
    tag: String,
    /// PING attempts made by [`RedisServer::new`] before giving up.
    #[builder(default = 20)]
    ready_attempts: u32,
}

impl Default for RedisServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Test fixture for a single Redis server. The container stops on drop.
pub struct RedisServer {
    container: ContainerAsync<GenericImage>,
}

impl RedisServer {
    /// Starts the container and waits until it answers `PING`.
    pub async fn new(config: RedisServerConfig) -> Result<Self> {
        let container = GenericImage::new(config.image.as_str(), config.tag.as_str())
            .with_exposed_port(6379_u16.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .with_startup_timeout(Duration::from_secs(60))
            .start()
            .await?;

        let server = Self { container };
        server.wait_ready(config.ready_attempts).await?;
        Ok(server)
    }

    pub async fn host(&self) -> Result<String> {
        let host = self.container.get_host().await?.to_string();

        match host.as_str() {
            "localhost" => Ok(String::from("127.0.0.1")),
            _ => Ok(host),
        }
    }

    pub async fn port(&self) -> Result<u16> {
        Ok(self.container.get_host_port_ipv4(6379).await?)
    }

    /// Connection URL for clients, e.g. `redis://127.0.0.1:32768`.
    pub async fn url(&self) -> Result<String> {
        let host = self.host().await?;
        let port = self.port().await?;
        Ok(format!("redis://{}:{}", host, port))
    }

    async fn wait_ready(&self, attempts: u32) -> Result<()> {
        let client = redis::Client::open(self.url().await?)?;

        for _ in 0..attempts {
            if let Ok(mut conn) = client.get_multiplexed_async_connection().await {
                let pong: redis::RedisResult<String> =
                    redis::cmd("PING").query_async(&mut conn).await;
                if pong.is_ok() {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        Err(TestInfraError::NotReady { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = RedisServerConfig::default();
        assert_eq!(config.image, "redis");
        assert_eq!(config.tag, "8.6.0");
        assert_eq!(config.ready_attempts, 20);
    }
}
