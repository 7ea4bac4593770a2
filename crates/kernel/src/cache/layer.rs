//! Two-tier cache with Moka (L1) and an optional Redis (L2).
//!
//! Every entry carries its own TTL. L1 keeps an entry for at most
//! [`L1_MAX_TTL_SECS`] or its TTL, whichever is shorter.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use redis::AsyncCommands;
use redis::Client as RedisClient;
use tracing::{debug, warn};

use super::{CacheError, PageCacheStore};

/// Upper bound on how long L1 holds an entry (60 seconds).
const L1_MAX_TTL_SECS: u64 = 60;

/// Longest L1 lifetime for an entry promoted from L2.
const L1_PROMOTE_TTL_SECS: u64 = 30;

/// Maximum L1 cache capacity.
const L1_MAX_CAPACITY: u64 = 10_000;

/// L1 lifetime for an entry promoted from L2 with `remaining_ms` left
/// (Redis `PTTL`: -1 means no expiry, -2 means the key is gone).
///
/// Never outlives the L2 copy. `None` when nothing should be promoted.
fn promote_ttl(remaining_ms: i64) -> Option<Duration> {
    let cap = Duration::from_secs(L1_PROMOTE_TTL_SECS);
    match remaining_ms {
        -1 => Some(cap),
        ms if ms > 0 => Some(Duration::from_millis(ms.unsigned_abs()).min(cap)),
        _ => None,
    }
}

#[derive(Clone)]
struct Entry {
    value: String,
    ttl: Duration,
}

/// Per-entry expiry for L1.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Two-tier cache layer.
///
/// L1 (Moka): In-process, short TTL, per-instance
/// L2 (Redis): Shared across instances, full TTL
#[derive(Clone)]
pub struct CacheLayer {
    inner: Arc<CacheLayerInner>,
}

struct CacheLayerInner {
    /// L1 in-process cache.
    local: Cache<String, Entry>,

    /// L2 Redis client, absent when running without Redis.
    redis: Option<RedisClient>,
}

impl CacheLayer {
    /// Create a cache layer backed by Redis.
    pub fn new(redis: RedisClient) -> Self {
        Self::build(Some(redis))
    }

    /// Create a cache layer that only uses the in-process tier.
    pub fn in_memory() -> Self {
        Self::build(None)
    }

    fn build(redis: Option<RedisClient>) -> Self {
        let local = Cache::builder()
            .max_capacity(L1_MAX_CAPACITY)
            .expire_after(EntryExpiry)
            .build();

        Self {
            inner: Arc::new(CacheLayerInner { local, redis }),
        }
    }

    /// Whether a Redis tier is configured.
    pub fn has_redis(&self) -> bool {
        self.inner.redis.is_some()
    }

    /// L1 lifetime for an entry whose full lifetime is `ttl_secs`.
    ///
    /// Without Redis the in-process tier is the only copy, so it keeps the
    /// entry for its whole TTL.
    fn local_ttl(&self, ttl_secs: u64) -> Duration {
        if self.has_redis() {
            Duration::from_secs(ttl_secs.min(L1_MAX_TTL_SECS))
        } else {
            Duration::from_secs(ttl_secs)
        }
    }

    /// Ping Redis. Always healthy when no Redis tier is configured.
    pub async fn redis_healthy(&self) -> bool {
        let Some(client) = &self.inner.redis else {
            return true;
        };
        let Ok(mut conn) = client.get_multiplexed_async_connection().await else {
            return false;
        };
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }

    /// Get cache statistics (for monitoring).
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_entry_count: self.inner.local.entry_count(),
            l1_weighted_size: self.inner.local.weighted_size(),
        }
    }
}

#[async_trait]
impl PageCacheStore for CacheLayer {
    /// Checks L1 first, then L2. On L2 hit, populates L1.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if let Some(entry) = self.inner.local.get(key).await {
            debug!(key = %key, "cache L1 hit");
            return Ok(Some(entry.value));
        }

        let Some(client) = &self.inner.redis else {
            return Ok(None);
        };

        let mut conn = match client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "failed to get Redis connection for cache");
                return Ok(None);
            }
        };

        let (val, remaining_ms): (Option<String>, i64) = match redis::pipe()
            .get(key)
            .pttl(key)
            .query_async(&mut conn)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, key = %key, "failed to read cache value from Redis");
                return Ok(None);
            }
        };

        if let (Some(v), Some(ttl)) = (&val, promote_ttl(remaining_ms)) {
            debug!(key = %key, ttl_ms = ttl.as_millis(), "cache L2 hit, populating L1");
            let entry = Entry {
                value: v.clone(),
                ttl,
            };
            self.inner.local.insert(key.to_string(), entry).await;
        }

        Ok(val)
    }

    /// Writes to both L1 and L2.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError> {
        if ttl_secs == 0 {
            return Err(CacheError::InvalidTtl);
        }

        let entry = Entry {
            value: value.to_string(),
            ttl: self.local_ttl(ttl_secs),
        };
        self.inner.local.insert(key.to_string(), entry).await;

        let Some(client) = &self.inner.redis else {
            debug!(key = %key, ttl = %ttl_secs, "cache set (L1 only)");
            return Ok(());
        };

        let Ok(mut conn) = client.get_multiplexed_async_connection().await else {
            warn!("failed to get Redis connection for cache set");
            return Ok(());
        };

        if let Err(e) = conn.set_ex::<_, _, ()>(key, value, ttl_secs).await {
            warn!(error = %e, key = %key, "failed to set cache value in Redis");
            return Ok(());
        }

        debug!(key = %key, ttl = %ttl_secs, "cache set");
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.inner.local.invalidate(key).await;

        let Some(client) = &self.inner.redis else {
            return Ok(());
        };

        let Ok(mut conn) = client.get_multiplexed_async_connection().await else {
            warn!("failed to get Redis connection for cache invalidate");
            return Ok(());
        };

        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(error = %e, key = %key, "failed to delete cache key from Redis");
        }

        debug!(key = %key, "cache invalidated");
        Ok(())
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of entries in L1 cache.
    pub l1_entry_count: u64,

    /// Weighted size of L1 cache.
    pub l1_weighted_size: u64,
}

impl std::fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheLayer")
            .field("redis", &self.has_redis())
            .finish()
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_set_get() {
        let cache = CacheLayer::in_memory();
        cache.set("page", "<p>hi</p>", 600).await.unwrap();
        assert_eq!(cache.get("page").await.unwrap().as_deref(), Some("<p>hi</p>"));
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let cache = CacheLayer::in_memory();
        let err = cache.set("page", "x", 0).await.unwrap_err();
        assert!(matches!(err, CacheError::InvalidTtl));
        assert!(cache.get("page").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = CacheLayer::in_memory();
        cache.set("page", "x", 60).await.unwrap();
        cache.invalidate("page").await.unwrap();
        assert!(cache.get("page").await.unwrap().is_none());
    }

    #[test]
    fn test_local_ttl_capped_only_with_redis() {
        let memory = CacheLayer::in_memory();
        assert_eq!(memory.local_ttl(600), Duration::from_secs(600));

        let client = RedisClient::open("redis://127.0.0.1:6379").unwrap();
        let layered = CacheLayer::new(client);
        assert_eq!(layered.local_ttl(600), Duration::from_secs(L1_MAX_TTL_SECS));
        assert_eq!(layered.local_ttl(5), Duration::from_secs(5));
    }

    #[test]
    fn test_promotion_never_outlives_l2() {
        assert_eq!(promote_ttl(1_000), Some(Duration::from_secs(1)));
        let cap = Some(Duration::from_secs(L1_PROMOTE_TTL_SECS));
        assert_eq!(promote_ttl(120_000), cap);
        assert_eq!(promote_ttl(-1), cap);
        assert_eq!(promote_ttl(-2), None);
        assert_eq!(promote_ttl(0), None);
    }

    #[tokio::test]
    async fn test_redis_healthy_without_redis() {
        assert!(CacheLayer::in_memory().redis_healthy().await);
    }
}
