//! Full-page cache accessor.
//!
//! Pages are keyed by request path plus normalized query string.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::Response;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{CacheError, PageCacheStore};
use crate::metrics::Metrics;

/// Response header telling clients whether the page came from cache.
pub const CACHE_STATUS_HEADER: &str = "x-bolt-cache";

/// Normalize a query string so parameter order does not matter.
///
/// Pairs are decoded, stable-sorted by name, and re-encoded.
pub fn normalize_query(query: &str) -> String {
    let query = query.trim_start_matches('?');
    if query.is_empty() {
        return String::new();
    }

    let mut pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Cache key for a page: SHA-256 hex of path + normalized query.
pub fn page_cache_key(path: &str, query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(normalize_query(query).as_bytes());
    hex::encode(hasher.finalize())
}

/// Max-age advertised for a cached page.
///
/// Half the stored TTL, so a downstream proxy holding the page for its full
/// max-age never serves it for more than the original TTL in total.
pub fn advertised_max_age(ttl_secs: u64) -> u64 {
    ttl_secs / 2
}

/// Build the response for a page served from cache.
pub fn cached_response(html: String, ttl_secs: u64) -> Response {
    let age = advertised_max_age(ttl_secs);
    let mut response = Response::new(Body::from(html));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("text/html; charset=utf-8"),
    );
    let cache_control = format!("max-age={age}, public, s-maxage={age}");
    if let Ok(value) = header::HeaderValue::from_str(&cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    headers.insert(CACHE_STATUS_HEADER, header::HeaderValue::from_static("HIT"));

    response
}

/// Fetch and store rendered pages.
#[derive(Clone)]
pub struct PageCache {
    store: Arc<dyn PageCacheStore>,
    metrics: Arc<Metrics>,
}

impl PageCache {
    pub fn new(store: Arc<dyn PageCacheStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Look up a page. A missing or empty entry is `None`.
    pub async fn fetch(&self, path: &str, query: &str) -> Result<Option<String>, CacheError> {
        let key = page_cache_key(path, query);
        let html = self.store.get(&key).await?.filter(|html| !html.is_empty());

        if html.is_some() {
            self.metrics.record_cache_hit();
            debug!(path = %path, "page cache hit");
        } else {
            self.metrics.record_cache_miss();
        }

        Ok(html)
    }

    /// Store a rendered page for `ttl_secs` seconds.
    pub async fn store(
        &self,
        path: &str,
        query: &str,
        html: &str,
        ttl_secs: u64,
    ) -> Result<(), CacheError> {
        if ttl_secs == 0 {
            return Err(CacheError::InvalidTtl);
        }

        let key = page_cache_key(path, query);
        self.store.set(&key, html, ttl_secs).await?;
        debug!(path = %path, ttl = ttl_secs, "page stored in cache");
        Ok(())
    }
}

impl std::fmt::Debug for PageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache").finish_non_exhaustive()
    }
}
