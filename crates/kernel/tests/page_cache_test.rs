#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Full-page cache tests.

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode, header};
use bolt_kernel::cache::{
    CACHE_STATUS_HEADER, CacheError, CacheLayer, PageCache, PageCacheStore, page_cache_key,
};
use bolt_kernel::metrics::Metrics;
use bolt_kernel::request::RequestContext;
use bolt_kernel::settings::CachingSettings;

use common::{TestRender, body_string, request_caching};

#[tokio::test]
async fn test_store_then_fetch() {
    let t = TestRender::new(&[], request_caching(), false);
    let req = RequestContext::new(Method::GET, "/about", "b=2&a=1");

    assert!(t.render.fetch_cached_request(&req).await.unwrap().is_none());
    assert!(t.render.cache_request(&req, "<p>about</p>").await.unwrap());

    let cached = t.render.fetch_cached_request(&req).await.unwrap().unwrap();
    assert_eq!(cached.status(), StatusCode::OK);
    assert_eq!(cached.headers()[CACHE_STATUS_HEADER], "HIT");
    assert_eq!(body_string(cached).await, "<p>about</p>");
}

#[tokio::test]
async fn test_query_order_shares_entry() {
    let t = TestRender::new(&[], request_caching(), false);
    let stored = RequestContext::new(Method::GET, "/list", "page=2&sort=title");
    t.render.cache_request(&stored, "list").await.unwrap();

    let reordered = RequestContext::new(Method::GET, "/list", "sort=title&page=2");
    assert!(
        t.render
            .fetch_cached_request(&reordered)
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_different_query_misses() {
    let t = TestRender::new(&[], request_caching(), false);
    let stored = RequestContext::new(Method::GET, "/list", "page=2");
    t.render.cache_request(&stored, "page two").await.unwrap();

    let other = RequestContext::new(Method::GET, "/list", "page=3");
    assert!(t.render.fetch_cached_request(&other).await.unwrap().is_none());
}

#[tokio::test]
async fn test_max_age_is_half_the_duration() {
    let t = TestRender::new(&[], request_caching(), false);
    assert_eq!(t.render.cache_duration(), 600);

    let req = RequestContext::new(Method::GET, "/about", "");
    t.render.cache_request(&req, "about").await.unwrap();
    let cached = t.render.fetch_cached_request(&req).await.unwrap().unwrap();

    assert_eq!(
        cached.headers()[header::CACHE_CONTROL],
        "max-age=300, public, s-maxage=300"
    );
}

#[tokio::test]
async fn test_disabled_request_cache_is_bypassed() {
    let t = TestRender::new(&[], CachingSettings::default(), false);
    let req = RequestContext::new(Method::GET, "/about", "");

    assert!(!t.render.cache_request(&req, "about").await.unwrap());
    assert!(t.render.fetch_cached_request(&req).await.unwrap().is_none());
}

#[tokio::test]
async fn test_force_refresh_rewrites_entry() {
    let t = TestRender::new(&[], request_caching(), false);
    let plain = RequestContext::new(Method::GET, "/about", "");
    t.render.cache_request(&plain, "old").await.unwrap();

    let refresh = RequestContext::new(Method::GET, "/about", "force_refresh=1");
    assert!(t.render.fetch_cached_request(&refresh).await.unwrap().is_none());
    assert!(t.render.cache_request(&refresh, "new").await.unwrap());

    // force_refresh is part of the query, so it has its own entry
    let cached = t.render.fetch_cached_request(&plain).await.unwrap().unwrap();
    assert_eq!(body_string(cached).await, "old");
}

#[tokio::test]
async fn test_zero_duration_is_rejected() {
    let caching = CachingSettings {
        duration_minutes: 0,
        ..request_caching()
    };
    let t = TestRender::new(&[], caching, false);
    let req = RequestContext::new(Method::GET, "/about", "");

    let err = t.render.cache_request(&req, "about").await.unwrap_err();
    assert!(matches!(
        err,
        bolt_kernel::theme::RenderError::Cache(CacheError::InvalidTtl)
    ));
}

#[tokio::test]
async fn test_empty_value_counts_as_absent() {
    let layer = CacheLayer::in_memory();
    let metrics = Arc::new(Metrics::new());
    let cache = PageCache::new(Arc::new(layer.clone()), metrics);

    layer
        .set(&page_cache_key("/empty", ""), "", 60)
        .await
        .unwrap();

    assert!(cache.fetch("/empty", "").await.unwrap().is_none());
}

#[tokio::test]
async fn test_hits_and_misses_are_counted() {
    let t = TestRender::new(&[], request_caching(), false);
    let req = RequestContext::new(Method::GET, "/about", "");

    t.render.fetch_cached_request(&req).await.unwrap();
    t.render.cache_request(&req, "about").await.unwrap();
    t.render.fetch_cached_request(&req).await.unwrap();

    assert_eq!(t.metrics.cache_misses.get(), 1);
    assert_eq!(t.metrics.cache_hits.get(), 1);
}
