use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::ProgressSnapshot;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Two-tier cache for progress snapshots.
///
/// The session-start status fetch and /chat/progress hit this before any
/// store; every successful turn invalidates the user's entry. L1 is
/// in-process (moka), L2 is Redis shared across instances.
pub struct ProgressCache {
    // ConnectionManager needs interior mutability
    redis: Arc<tokio::sync::Mutex<ConnectionManager>>,
    l1: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl ProgressCache {
    /// Create a new progress cache
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        let l1 = moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Ok(Self {
            redis: Arc::new(tokio::sync::Mutex::new(redis)),
            l1,
            ttl_secs,
        })
    }

    /// Cache key for a user's progress snapshot
    pub fn key(user_id: &str) -> String {
        format!("diana:progress:{}", user_id)
    }

    /// Look up a cached snapshot (L1 first, then Redis)
    pub async fn get(&self, user_id: &str) -> Result<Option<ProgressSnapshot>, CacheError> {
        let key = Self::key(user_id);

        if let Some(bytes) = self.l1.get(&key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(Some(serde_json::from_slice(&bytes)?));
        }

        let mut conn = self.redis.lock().await;
        let value: Option<String> = redis::cmd("GET").arg(&key).query_async(&mut *conn).await?;
        drop(conn);

        match value {
            Some(json) => {
                tracing::trace!("L2 cache hit: {}", key);
                self.l1.insert(key, json.as_bytes().to_vec()).await;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => {
                tracing::trace!("Cache miss: {}", key);
                Ok(None)
            }
        }
    }

    /// Store a snapshot in both tiers
    pub async fn put(
        &self,
        user_id: &str,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), CacheError> {
        let key = Self::key(user_id);
        let json = serde_json::to_string(snapshot)?;

        self.l1.insert(key.clone(), json.as_bytes().to_vec()).await;

        let mut conn = self.redis.lock().await;
        redis::cmd("SETEX")
            .arg(&key)
            .arg(self.ttl_secs)
            .arg(json)
            .query_async::<()>(&mut *conn)
            .await?;
        drop(conn);

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Drop a user's snapshot from both tiers (called after every turn)
    pub async fn invalidate(&self, user_id: &str) -> Result<(), CacheError> {
        let key = Self::key(user_id);
        self.l1.invalidate(&key).await;

        let mut conn = self.redis.lock().await;
        redis::cmd("DEL")
            .arg(&key)
            .query_async::<()>(&mut *conn)
            .await?;

        Ok(())
    }
}
