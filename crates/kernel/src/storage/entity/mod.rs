//! Storage entities.

mod content;

pub use content::{Content, STATUS_PUBLISHED};
