//! Rendered template response.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};

/// The result of rendering a template.
///
/// Keeps the resolved template name and the exact context and globals the
/// template saw, so later response processing can inspect them.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateResponse {
    template: String,
    context: Map<String, Value>,
    globals: Map<String, Value>,
    content: String,
}

impl TemplateResponse {
    pub fn new(
        template: String,
        context: Map<String, Value>,
        globals: Map<String, Value>,
        content: String,
    ) -> Self {
        Self {
            template,
            context,
            globals,
            content,
        }
    }

    /// Name of the template that was rendered.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn globals(&self) -> &Map<String, Value> {
        &self.globals
    }

    /// Rendered HTML.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Take the rendered HTML.
    pub fn into_content(self) -> String {
        self.content
    }
}

impl IntoResponse for TemplateResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            self.content,
        )
            .into_response()
    }
}
