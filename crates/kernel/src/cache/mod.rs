//! Page cache: storage backends, keying, and the cache policy.

mod layer;
mod page;
pub mod policy;

use async_trait::async_trait;
use thiserror::Error;

pub use layer::{CacheLayer, CacheStats};
pub use page::{
    CACHE_STATUS_HEADER, PageCache, advertised_max_age, cached_response, normalize_query,
    page_cache_key,
};
pub use policy::{CacheAccess, CacheKind, CachePolicyContext, can_use_cache};

/// Cache errors.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache entries need a TTL greater than zero")]
    InvalidTtl,

    #[error("cache backend error")]
    Backend(#[from] anyhow::Error),
}

/// Key-value store with per-entry TTL used by the page cache.
#[async_trait]
pub trait PageCacheStore: Send + Sync {
    /// Get a value, `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value for `ttl_secs` seconds.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), CacheError>;

    /// Remove a value.
    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}
