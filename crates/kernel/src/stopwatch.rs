//! Named timing events.
//!
//! A [`Stopwatch`] receives start/stop pairs for named events. Callers
//! should go through [`StopwatchEvent`], which measures the event and stops
//! it when dropped, so an early return or error never leaves it open.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::metrics::Metrics;

/// Sink for named timing events.
///
/// Events with the same name may overlap when requests run concurrently, so
/// the elapsed time is measured by the caller and handed to `stop`.
pub trait Stopwatch: Send + Sync {
    /// The event `name` in `category` started.
    fn start(&self, name: &str, category: &str);

    /// The event `name` in `category` stopped after `elapsed`.
    fn stop(&self, name: &str, category: &str, elapsed: Duration);
}

/// Scope guard for a started event; stops it on drop.
#[must_use = "the event stops as soon as the guard is dropped"]
pub struct StopwatchEvent<'a> {
    stopwatch: &'a dyn Stopwatch,
    name: &'a str,
    category: &'a str,
    started: Instant,
}

impl<'a> StopwatchEvent<'a> {
    /// Start `name` on `stopwatch`.
    pub fn start(stopwatch: &'a dyn Stopwatch, name: &'a str, category: &'a str) -> Self {
        stopwatch.start(name, category);
        Self {
            stopwatch,
            name,
            category,
            started: Instant::now(),
        }
    }
}

impl Drop for StopwatchEvent<'_> {
    fn drop(&mut self) {
        self.stopwatch
            .stop(self.name, self.category, self.started.elapsed());
    }
}

/// Stopwatch that reports event durations to Prometheus.
#[derive(Debug)]
pub struct MetricsStopwatch {
    metrics: Arc<Metrics>,
}

impl MetricsStopwatch {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

impl Stopwatch for MetricsStopwatch {
    fn start(&self, name: &str, category: &str) {
        trace!(event = %name, category = %category, "stopwatch event started");
    }

    fn stop(&self, name: &str, category: &str, elapsed: Duration) {
        let elapsed = elapsed.as_secs_f64();
        trace!(
            event = %name,
            category = %category,
            elapsed_secs = elapsed,
            "stopwatch event stopped"
        );
        self.metrics.record_event(name, category, elapsed);
    }
}
