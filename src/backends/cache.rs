// src/backends/cache.rs
use crate::health::{Cache, ProbeError};
use async_trait::async_trait;
use dashmap::DashMap;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

/// Redis store. The connection is opened on first use and then shared.
pub struct RedisCache {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
}

impl RedisCache {
    pub fn open(url: &str) -> redis::RedisResult<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
            conn: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, ProbeError> {
        // One retry at 100ms; a probe must not sit in backoff.
        self.conn
            .get_or_try_init(|| ConnectionManager::new_with_backoff(self.client.clone(), 2, 100, 1))
            .await
            .cloned()
            .map_err(cache_error)
    }
}

fn cache_error(err: redis::RedisError) -> ProbeError {
    ProbeError::Cache(err.to_string())
}

#[async_trait]
impl Cache for RedisCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ProbeError> {
        let mut conn = self.connection().await?;
        // SET EX rejects 0
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(cache_error)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ProbeError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key).await.map_err(cache_error)
    }

    async fn forget(&self, key: &str) -> Result<bool, ProbeError> {
        let mut conn = self.connection().await?;
        let removed: i64 = conn.del(key).await.map_err(cache_error)?;
        Ok(removed > 0)
    }
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process store; contents live as long as the process.
#[derive(Debug, Default)]
pub struct ArrayCache {
    entries: DashMap<String, Entry>,
}

impl ArrayCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Cache for ArrayCache {
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), ProbeError> {
        if ttl.is_zero() {
            self.entries.remove(key);
            return Ok(());
        }

        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, ProbeError> {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
            Some(_) => {}
            None => return Ok(None),
        }

        // Expired: drop it lazily.
        self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    async fn forget(&self, key: &str) -> Result<bool, ProbeError> {
        Ok(self.entries.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_array_cache_round_trip() {
        let cache = ArrayCache::new();

        cache.put("k", "true", Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("true"));
        assert!(cache.forget("k").await.unwrap());
        assert!(!cache.forget("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_array_cache_expiry() {
        let cache = ArrayCache::new();

        cache.put("k", "v", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_array_cache_zero_ttl_removes() {
        let cache = ArrayCache::new();

        cache.put("k", "v", Duration::from_secs(5)).await.unwrap();
        cache.put("k", "v", Duration::ZERO).await.unwrap();
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_redis_unreachable_reports_fault() {
        let cache = RedisCache::open("redis://127.0.0.1:1/").unwrap();

        let err = cache
            .put("health-check-1", "true", Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Cache(_)));
    }

    #[test]
    fn test_redis_bad_url() {
        assert!(RedisCache::open("memcached://nowhere").is_err());
    }
}
