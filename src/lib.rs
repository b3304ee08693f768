//! Follows generated interview-prep articles until they are ready and renders
//! their Markdown bodies.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
