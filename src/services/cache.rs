use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use crate::models::UserRankings;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// L1 is in-process and bounded; L2 (Redis) is shared across instances and is
/// optional. Without Redis the cache runs L1-only, which is enough for a single
/// instance and for tests.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache manager backed by Redis
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// Create an in-process only cache manager
    pub fn local(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let Some(l2) = &self.redis else {
            tracing::trace!("Cache miss: {}", key);
            return Err(CacheError::CacheMiss(key.to_string()));
        };

        let mut conn = l2.lock().await;
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut *conn)
            .await?;
        drop(conn);

        if let Some(json) = value {
            tracing::trace!("L2 cache hit: {}", key);

            // Populate L1 cache
            let bytes = json.as_bytes().to_vec();
            self.l1_cache.insert(key.to_string(), bytes).await;

            return Ok(serde_json::from_str(&json)?);
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in cache (both L1 and L2)
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        let bytes = json.as_bytes().to_vec();
        self.l1_cache.insert(key.to_string(), bytes).await;

        if let Some(l2) = &self.redis {
            let mut conn = l2.lock().await;
            let _: () = redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from both cache tiers
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        if let Some(l2) = &self.redis {
            let mut conn = l2.lock().await;
            let _: () = redis::cmd("DEL")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Cached rankings for a viewer, `None` on a miss
    pub async fn get_rankings(&self, user_id: &str) -> Result<Option<UserRankings>, CacheError> {
        match self.get::<UserRankings>(&CacheKey::rankings(user_id)).await {
            Ok(rankings) => Ok(Some(rankings)),
            Err(CacheError::CacheMiss(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn put_rankings(&self, rankings: &UserRankings) -> Result<(), CacheError> {
        self.set(&CacheKey::rankings(&rankings.user_id), rankings).await
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            redis_enabled: self.redis.is_some(),
            ttl_secs: self.ttl_secs,
        }
    }
}

fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
    moka::future::CacheBuilder::new(l1_size)
        .time_to_live(Duration::from_secs(ttl_secs))
        .build()
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub redis_enabled: bool,
    pub ttl_secs: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a viewer's precomputed rankings
    pub fn rankings(user_id: &str) -> String {
        format!("rankings:{}", user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RankedCandidate;
    use chrono::Utc;

    #[tokio::test]
    #[ignore = "Requires Redis"]
    async fn test_cache_set_get() {
        let cache = CacheManager::new("redis://127.0.0.1:6379", 1000, 60)
            .await
            .expect("Failed to create cache");

        let key = "test_key";
        let value = "test_value";

        cache.set(key, &value).await.unwrap();
        let result: String = cache.get(key).await.unwrap();
        assert_eq!(result, value);

        cache.delete(key).await.unwrap();
        assert!(cache.get::<String>(key).await.is_err());
    }

    #[tokio::test]
    async fn test_local_rankings_roundtrip() {
        let cache = CacheManager::local(100, 60);
        assert!(cache.get_rankings("viewer").await.unwrap().is_none());

        let rankings = UserRankings {
            user_id: "viewer".to_string(),
            candidates: vec![RankedCandidate {
                candidate_id: "c1".to_string(),
                score: 87.5,
                reasons: vec!["Shared interests: Hiking".to_string()],
            }],
            computed_at: Utc::now(),
        };
        cache.put_rankings(&rankings).await.unwrap();

        let cached = cache.get_rankings("viewer").await.unwrap().unwrap();
        assert_eq!(cached.candidates, rankings.candidates);

        cache.delete(&CacheKey::rankings("viewer")).await.unwrap();
        assert!(cache.get_rankings("viewer").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_local_stats() {
        let cache = CacheManager::local(100, 60);
        cache.set("k", &"v").await.unwrap();
        cache.l1_cache.run_pending_tasks().await;

        let stats = cache.stats();
        assert!(!stats.redis_enabled);
        assert_eq!(stats.l1_size, 1);
        assert_eq!(stats.ttl_secs, 60);
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::rankings("user123"), "rankings:user123");
    }
}
