use serde::Serialize;
use thiserror::Error;

/// Fenced code lifted out of the document for dedicated rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    /// First token of the fence info string, e.g. `python`.
    pub language: Option<String>,
    /// Code text with the fence's trailing newline removed.
    pub text: String,
}

impl CodeBlock {
    pub fn new(language: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            language: language
                .map(str::trim)
                .filter(|lang| !lang.is_empty())
                .map(str::to_string),
            text: text.into(),
        }
    }
}

/// One top-level node of a rendered article body, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// Heading, paragraph, list, table and so on, as sanitised HTML. `code`
    /// lists the fences nested inside, already rendered into `html`.
    Content {
        html: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        code: Vec<CodeBlock>,
    },
    Code(CodeBlock),
}

impl Block {
    pub fn as_code(&self) -> Option<&CodeBlock> {
        match self {
            Block::Code(block) => Some(block),
            Block::Content { .. } => None,
        }
    }

    pub fn as_html(&self) -> Option<&str> {
        match self {
            Block::Content { html, .. } => Some(html.as_str()),
            Block::Code(_) => None,
        }
    }

    /// Every fenced block this block carries, top-level or nested.
    pub fn code_blocks(&self) -> &[CodeBlock] {
        match self {
            Block::Code(block) => std::slice::from_ref(block),
            Block::Content { code, .. } => code,
        }
    }
}

/// Structured errors surfaced by the rendering pipeline.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("syntax highlighting failed: {language}: {message}")]
    Highlighting { language: String, message: String },
}
