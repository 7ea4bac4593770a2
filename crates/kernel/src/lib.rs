//! Bolt kernel library.
//!
//! Template rendering with full-page caching, the content entity, and the
//! Composer hooks that install extensions. The server entry point is the
//! `bolt` binary.

pub mod cache;
pub mod composer;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod request;
pub mod routes;
pub mod session;
pub mod settings;
pub mod state;
pub mod stopwatch;
pub mod storage;
pub mod theme;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::AppState;

/// Build the application router.
///
/// The session layer is left to the caller, which picks the store.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::metrics::router())
        .merge(routes::preview::router())
        .merge(routes::page::router())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
