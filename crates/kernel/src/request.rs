//! Per-request inputs to rendering and caching.

use axum::http::Method;
use axum::http::request::Parts;

/// Query parameter that forces a fresh render.
pub const FORCE_REFRESH_PARAM: &str = "force_refresh";

/// What the render layer needs to know about the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// HTTP method.
    pub method: Method,
    /// Path info, e.g. `/entry/hello-world`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: String,
    /// `force_refresh=1` was passed.
    pub force_refresh: bool,
    /// Logged-in username, if any.
    pub username: Option<String>,
}

impl RequestContext {
    /// Build a context for an anonymous request.
    pub fn new(method: Method, path: impl Into<String>, query: impl Into<String>) -> Self {
        let query = query.into();
        let force_refresh = force_refresh_requested(&query);
        Self {
            method,
            path: path.into(),
            query,
            force_refresh,
            username: None,
        }
    }

    /// Build a context from request parts.
    pub fn from_parts(parts: &Parts, username: Option<String>) -> Self {
        let query = parts.uri.query().unwrap_or_default();
        Self::new(parts.method.clone(), parts.uri.path(), query).with_username(username)
    }

    /// Set the logged-in user.
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    /// Whether a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }
}

/// Whether `force_refresh` is set to 1 in a query string.
///
/// Any value that reads as the number one counts (`1`, `1.0`, ` 1`).
pub fn force_refresh_requested(query: &str) -> bool {
    url::form_urlencoded::parse(query.as_bytes())
        .filter(|(key, _)| key == FORCE_REFRESH_PARAM)
        .last()
        .and_then(|(_, value)| value.trim().parse::<f64>().ok())
        .is_some_and(|value| value == 1.0)
}
