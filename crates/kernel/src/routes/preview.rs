//! Preview route.
//!
//! Renders a page with the safe renderer, so previews never read from or
//! write to the page cache.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::Method;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::Value;

use super::page::{page_context, site_globals};
use crate::error::AppResult;
use crate::request::RequestContext;
use crate::state::AppState;
use crate::theme::ThemeEngine;

/// Create the preview router.
pub fn router() -> Router<AppState> {
    Router::new().route("/preview/{*path}", get(preview))
}

async fn preview(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> AppResult<impl IntoResponse> {
    let path = format!("/{}", path.trim_start_matches('/'));
    let req = RequestContext::new(Method::GET, path, "");

    let mut context = page_context(&req);
    context.insert("preview".to_string(), Value::Bool(true));

    let response = state.safe_render().render(
        ThemeEngine::page_suggestions(&req.path),
        context,
        site_globals(&state),
    )?;

    Ok(response)
}
