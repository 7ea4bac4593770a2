//! Content storage.

pub mod entity;
