use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use crate::error::AppError;

/// Ephemeral key-value accelerator with per-key TTL expiry. Never a source
/// of truth: every value it holds can be recomputed from the vote store.
#[async_trait]
pub trait SummaryCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    async fn set_with_ttl(&self, key: &str, payload: &[u8], ttl_secs: u64)
    -> Result<(), AppError>;
}

pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Low retry count and a short connect timeout: a dead cache must
    /// degrade the request to a store read quickly, not stall it.
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(100));

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl SummaryCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        let mut connection = self.connection.clone();
        connection
            .get(key)
            .await
            .map_err(|e| AppError::CacheUnavailable(e.to_string()))
    }

    async fn set_with_ttl(
        &self,
        key: &str,
        payload: &[u8],
        ttl_secs: u64,
    ) -> Result<(), AppError> {
        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(key, payload, ttl_secs)
            .await
            .map_err(|e| AppError::CacheUnavailable(e.to_string()))
    }
}
