//! Redis cache backend.
//!
//! The connection is established on first use and re-attempted on the next
//! call after a failure, so the server starts even while Redis is down.

use async_trait::async_trait;
use finance_engine::{Cache, StoreError};
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, RedisError};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Connection attempts made per call while Redis is unreachable.
const CONNECT_RETRIES: usize = 1;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Map a redis error onto the store error the engine understands.
pub fn cache_error(err: RedisError) -> StoreError {
    if err.is_io_error() || err.is_connection_refusal() || err.is_timeout() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

/// Cache backed by plain Redis strings. Entries are written without expiry.
pub struct RedisCache {
    client: Client,
    connection: OnceCell<ConnectionManager>,
}

impl RedisCache {
    /// Parse the connection URL. No connection is opened yet.
    pub fn open(redis_url: &str) -> Result<Self, StoreError> {
        let client = Client::open(redis_url).map_err(cache_error)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    /// Try to connect now, so startup can report the cache state.
    pub async fn warm_up(&self) -> Result<(), StoreError> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        self.connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(CONNECT_RETRIES)
                    .set_connection_timeout(CONNECT_TIMEOUT)
                    .set_response_timeout(RESPONSE_TIMEOUT);
                let manager =
                    ConnectionManager::new_with_config(self.client.clone(), config).await?;
                tracing::debug!("Redis connection established");
                Ok::<_, RedisError>(manager)
            })
            .await
            .cloned()
            .map_err(cache_error)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(cache_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(key, value).await.map_err(cache_error)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key).await.map_err(cache_error)
    }
}
