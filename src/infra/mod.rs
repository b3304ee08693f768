//! Infrastructure adapters and runtime bootstrap.

pub mod cache;
pub mod clipboard;
pub mod error;
pub mod graphql;
mod lock;
pub mod telemetry;
