#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Everything here builds the real kernel components in memory: templates
//! are compiled from strings and the page cache runs without Redis.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;
use tower_sessions::cookie::SameSite;

use bolt_kernel::AppState;
use bolt_kernel::cache::{CacheLayer, PageCache};
use bolt_kernel::metrics::Metrics;
use bolt_kernel::session;
use bolt_kernel::settings::{CachingSettings, Settings};
use bolt_kernel::stopwatch::Stopwatch;
use bolt_kernel::theme::{Render, SandboxExtension, ThemeEngine};

/// Stopwatch that remembers every start and stop.
#[derive(Debug, Default)]
pub struct RecordingStopwatch {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingStopwatch {
    /// `("start" | "stop", name)` in the order they happened.
    pub fn events(&self) -> Vec<(String, String)> {
        self.events.lock().clone()
    }

    /// Number of starts minus stops.
    pub fn open_events(&self) -> usize {
        let events = self.events.lock();
        let starts = events.iter().filter(|(kind, _)| kind == "start").count();
        let stops = events.iter().filter(|(kind, _)| kind == "stop").count();
        starts - stops
    }
}

impl Stopwatch for RecordingStopwatch {
    fn start(&self, name: &str, _category: &str) {
        self.events
            .lock()
            .push(("start".to_string(), name.to_string()));
    }

    fn stop(&self, name: &str, _category: &str, _elapsed: Duration) {
        self.events
            .lock()
            .push(("stop".to_string(), name.to_string()));
    }
}

/// A renderer over in-memory templates, with the pieces tests inspect.
pub struct TestRender {
    pub render: Render,
    pub stopwatch: Arc<RecordingStopwatch>,
    pub sandbox: Arc<SandboxExtension>,
    pub metrics: Arc<Metrics>,
}

impl TestRender {
    pub fn new(templates: &[(&str, &str)], caching: CachingSettings, safe: bool) -> Self {
        let engine = Arc::new(
            ThemeEngine::from_templates(templates)
                .unwrap()
                .with_global("sitename", "Engine Site")
                .with_global("engine_only", "from engine"),
        );
        let stopwatch = Arc::new(RecordingStopwatch::default());
        let sandbox = Arc::new(SandboxExtension::default());
        let metrics = Arc::new(Metrics::new());
        let cache = PageCache::new(Arc::new(CacheLayer::in_memory()), metrics.clone());

        let render = Render::new(
            engine,
            sandbox.clone(),
            cache,
            caching,
            stopwatch.clone(),
            safe,
        );

        Self {
            render,
            stopwatch,
            sandbox,
            metrics,
        }
    }
}

/// Caching settings with full-page caching on.
pub fn request_caching() -> CachingSettings {
    CachingSettings {
        request: true,
        ..CachingSettings::default()
    }
}

/// Site settings with full-page caching on.
pub const CACHING_YAML: &str = "\
sitename: Test Site
caching:
    request: true
    duration: 10
";

/// Test application with in-memory templates, cache and sessions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new(templates: &[(&str, &str)], settings_yaml: &str) -> Self {
        let settings = Settings::from_yaml(settings_yaml).unwrap();
        let engine = ThemeEngine::from_templates(templates).unwrap();
        let state = AppState::build(settings, engine, CacheLayer::in_memory());

        let router = bolt_kernel::app(state.clone())
            .layer(session::memory_session_layer(SameSite::Strict));

        Self { router, state }
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Send a GET request.
    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }
}

/// Read a response body as text.
pub async fn body_string(response: Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}
