//! Application error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::theme::RenderError;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("render error")]
    Render(#[source] RenderError),
}

impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        if err.is_not_found() {
            tracing::debug!(error = %err, "no template for request");
            AppError::NotFound
        } else {
            AppError::Render(err)
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Details go to the log, not to the client
        let body = match &self {
            AppError::Render(e) => {
                tracing::error!(error = %e, "render error");
                "internal server error".to_string()
            }
            AppError::NotFound => self.to_string(),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_template_is_not_found() {
        let err = AppError::from(RenderError::TemplateNotFound {
            names: vec!["page".to_string()],
        });
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_sandbox_violation_is_server_error() {
        let err = AppError::from(RenderError::Sandbox(
            crate::theme::SecurityError::Filter("safe".to_string()),
        ));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
