//! Prometheus metrics collection.
//!
//! Provides application metrics in Prometheus format.

use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tracing::warn;

/// HTTP request labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct HttpLabels {
    pub method: String,
    pub path: String,
    pub status: u16,
}

/// Stopwatch event labels.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EventLabels {
    pub event: String,
    pub category: String,
}

/// Application metrics.
pub struct Metrics {
    registry: Registry,

    /// HTTP request counter by method/path/status.
    pub http_requests: Family<HttpLabels, Counter>,

    /// HTTP request duration histogram.
    pub http_duration_seconds: Family<HttpLabels, Histogram>,

    /// Duration of named stopwatch events (e.g. `bolt.render`).
    pub event_duration_seconds: Family<EventLabels, Histogram>,

    /// Page cache hit counter.
    pub cache_hits: Counter,

    /// Page cache miss counter.
    pub cache_misses: Counter,
}

impl Metrics {
    /// Create a new metrics registry.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let http_requests = Family::<HttpLabels, Counter>::default();
        registry.register(
            "http_requests",
            "Total HTTP requests",
            http_requests.clone(),
        );

        let http_duration_seconds = Family::<HttpLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 12))
        });
        registry.register(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
            http_duration_seconds.clone(),
        );

        let event_duration_seconds = Family::<EventLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.0001, 2.0, 14))
        });
        registry.register(
            "stopwatch_event_duration_seconds",
            "Duration of named stopwatch events in seconds",
            event_duration_seconds.clone(),
        );

        let cache_hits = Counter::default();
        registry.register("cache_hits", "Page cache hit count", cache_hits.clone());

        let cache_misses = Counter::default();
        registry.register(
            "cache_misses",
            "Page cache miss count",
            cache_misses.clone(),
        );

        Self {
            registry,
            http_requests,
            http_duration_seconds,
            event_duration_seconds,
            cache_hits,
            cache_misses,
        }
    }

    /// Record an HTTP request.
    pub fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let labels = HttpLabels {
            method: method.to_string(),
            path: normalize_path(path),
            status,
        };

        self.http_requests.get_or_create(&labels).inc();
        self.http_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record the duration of a stopwatch event.
    pub fn record_event(&self, event: &str, category: &str, duration_secs: f64) {
        let labels = EventLabels {
            event: event.to_string(),
            category: category.to_string(),
        };

        self.event_duration_seconds
            .get_or_create(&labels)
            .observe(duration_secs);
    }

    /// Record a cache hit.
    pub fn record_cache_hit(&self) {
        self.cache_hits.inc();
    }

    /// Record a cache miss.
    pub fn record_cache_miss(&self) {
        self.cache_misses.inc();
    }

    /// Encode metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = encode(&mut buffer, &self.registry) {
            warn!(error = %e, "failed to encode metrics");
        }
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish()
    }
}

/// Normalize a path for metrics labels.
///
/// Replaces numeric segments with a placeholder to limit cardinality.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|s| {
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                "{id}"
            } else {
                s
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
