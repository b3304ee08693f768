//! Application services: readiness tracking, rendering and page composition.

pub mod clipboard;
pub mod error;
pub mod page;
pub mod readiness;
pub mod render;
pub mod source;
