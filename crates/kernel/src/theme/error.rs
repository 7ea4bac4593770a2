//! Render errors.

use thiserror::Error;

use super::sandbox::SecurityError;
use crate::cache::CacheError;

/// Errors from rendering templates and snippets.
#[derive(Debug, Error)]
pub enum RenderError {
    /// None of the requested template names exist.
    #[error("unable to find template (looked for: {})", names.join(", "))]
    TemplateNotFound { names: Vec<String> },

    /// Template compilation or rendering failed.
    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    /// A sandboxed snippet used something the policy forbids.
    #[error(transparent)]
    Sandbox(#[from] SecurityError),

    /// The page cache backend failed.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl RenderError {
    /// Check if this error means no template could be resolved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RenderError::TemplateNotFound { .. })
    }
}
