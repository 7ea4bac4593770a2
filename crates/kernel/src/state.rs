//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use redis::Client as RedisClient;
use tracing::info;

use crate::cache::{CacheLayer, PageCache};
use crate::config::Config;
use crate::metrics::Metrics;
use crate::settings::{CachingSettings, Settings};
use crate::stopwatch::MetricsStopwatch;
use crate::theme::{Render, SandboxExtension, ThemeEngine};

/// Fallback site name when `general/sitename` is not set.
pub const DEFAULT_SITENAME: &str = "A sample site";

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Site settings from the YAML config file.
    settings: Settings,

    /// Two-tier cache layer (Moka L1 + Redis L2).
    cache: CacheLayer,

    /// Renderer for regular requests.
    render: Render,

    /// Renderer for previews; never reads or writes the page cache.
    safe_render: Render,

    /// Prometheus metrics.
    metrics: Arc<Metrics>,
}

impl AppState {
    /// Create application state from process configuration.
    pub async fn new(config: &Config) -> Result<Self> {
        let settings =
            Settings::load(&config.config_file).context("failed to load site settings")?;

        let cache = match &config.redis_url {
            Some(url) => {
                let redis = RedisClient::open(url.as_str())
                    .context("failed to create Redis client")?;

                let mut conn = redis
                    .get_multiplexed_async_connection()
                    .await
                    .context("failed to connect to Redis")?;

                redis::cmd("PING")
                    .query_async::<String>(&mut conn)
                    .await
                    .context("Redis PING failed")?;

                info!("page cache using Redis");
                CacheLayer::new(redis)
            }
            None => {
                info!("REDIS_URL not set, page cache is in-process only");
                CacheLayer::in_memory()
            }
        };

        let engine = ThemeEngine::new(&config.theme_dir).context("failed to load theme")?;

        Ok(Self::build(settings, engine, cache))
    }

    /// Assemble state from already loaded parts.
    pub fn build(settings: Settings, engine: ThemeEngine, cache: CacheLayer) -> Self {
        let metrics = Arc::new(Metrics::new());
        let engine = Arc::new(engine.with_global("bolt_version", env!("CARGO_PKG_VERSION")));
        let sandbox = Arc::new(SandboxExtension::default());
        let caching = CachingSettings::from_settings(&settings);
        let stopwatch = Arc::new(MetricsStopwatch::new(metrics.clone()));
        let page_cache = PageCache::new(Arc::new(cache.clone()), metrics.clone());

        let render = Render::new(
            engine.clone(),
            sandbox.clone(),
            page_cache.clone(),
            caching,
            stopwatch.clone(),
            false,
        );
        let safe_render = Render::new(engine, sandbox, page_cache, caching, stopwatch, true);

        Self {
            inner: Arc::new(AppStateInner {
                settings,
                cache,
                render,
                safe_render,
                metrics,
            }),
        }
    }

    /// Get the site settings.
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Site name shown in templates.
    pub fn sitename(&self) -> &str {
        self.inner
            .settings
            .get_str("general/sitename")
            .unwrap_or(DEFAULT_SITENAME)
    }

    /// Get the cache layer.
    pub fn cache(&self) -> &CacheLayer {
        &self.inner.cache
    }

    /// Renderer for regular requests.
    pub fn render(&self) -> &Render {
        &self.inner.render
    }

    /// Renderer for previews.
    pub fn safe_render(&self) -> &Render {
        &self.inner.safe_render
    }

    /// Get the metrics registry.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.inner.metrics
    }

    /// Check if Redis is healthy.
    pub async fn redis_healthy(&self) -> bool {
        self.inner.cache.redis_healthy().await
    }
}
