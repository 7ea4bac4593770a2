//! Page route handler.
//!
//! Every path without a dedicated route is a page: it is served from the
//! page cache when policy allows, and otherwise rendered from the most
//! specific `page--*` template.

use axum::Router;
use axum::extract::State;
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use tower_sessions::Session;
use tracing::warn;

use crate::cache::CACHE_STATUS_HEADER;
use crate::error::AppResult;
use crate::request::RequestContext;
use crate::session::current_username;
use crate::state::AppState;
use crate::theme::ThemeEngine;

/// Create the page router.
///
/// Pages are the fallback, so this router must be merged last.
pub fn router() -> Router<AppState> {
    Router::new().fallback(page)
}

/// Page handler.
async fn page(
    State(state): State<AppState>,
    session: Session,
    parts: Parts,
) -> AppResult<Response> {
    let username = current_username(&session).await;
    let req = RequestContext::from_parts(&parts, username);
    let render = state.render();

    if let Some(cached) = render.fetch_cached_request(&req).await? {
        return Ok(cached);
    }

    let suggestions = ThemeEngine::page_suggestions(&req.path);
    let response = render.render(suggestions, page_context(&req), site_globals(&state))?;
    let html = response.into_content();

    if let Err(e) = render.cache_request(&req, &html).await {
        warn!(path = %req.path, error = %e, "failed to cache page");
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::HeaderName::from_static(CACHE_STATUS_HEADER), "MISS"),
        ],
        html,
    )
        .into_response())
}

/// Template context for a page request.
pub(crate) fn page_context(req: &RequestContext) -> Map<String, Value> {
    let mut context = Map::new();
    context.insert("path".to_string(), Value::from(req.path.as_str()));
    context.insert("query".to_string(), Value::from(req.query.as_str()));
    context
}

/// Globals shared by every page.
pub(crate) fn site_globals(state: &AppState) -> Map<String, Value> {
    let mut globals = Map::new();
    globals.insert("sitename".to_string(), Value::from(state.sitename()));
    globals
}
