//! Article body rendering.
//!
//! The pipeline is pure: it accepts final markdown, produces an ordered list of
//! [`Block`]s and surfaces structured errors. Fenced code is handed to
//! [`CodeBlockRenderer`], which owns highlighting and the copy affordance.

mod code_block;
mod highlight;
mod options;
mod pipeline;
mod types;

pub use code_block::{COPY_INDICATOR_RESET, CodeBlockRenderer, CopyIndicator};
pub use highlight::CODE_THEME_CSS;
pub use pipeline::{MarkdownPipeline, PipelineConfig};
pub use types::{Block, CodeBlock, RenderError};
