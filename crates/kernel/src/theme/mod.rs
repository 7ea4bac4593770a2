//! Theme engine and template rendering.
//!
//! Provides Tera-based template rendering with template suggestion
//! resolution, sandboxed snippets, and full-page caching.

mod engine;
mod error;
mod render;
mod response;
pub mod sandbox;

pub use engine::{ThemeEngine, excerpt};
pub use error::RenderError;
pub use render::{RENDER_EVENT, Render, TemplateNames};
pub use response::TemplateResponse;
pub use sandbox::{SandboxExtension, SandboxScope, SecurityError, SecurityPolicy};
