use comrak::{
    Arena, format_html,
    nodes::{AstNode, NodeValue},
    parse_document,
};

use super::code_block::CodeBlockRenderer;
use super::options::{build_sanitizer, default_options};
use super::types::{Block, CodeBlock, RenderError};

/// Delimits the stand-in text a nested fence is swapped for before sanitising.
const SLOT_MARK: char = '\u{E000}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Drop a level-1 heading that opens the document on its first line. The
    /// page already shows the article title above the body.
    pub suppress_leading_heading: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            suppress_leading_heading: true,
        }
    }
}

/// Markdown → [`Block`] transform for final article bodies.
///
/// Pure and deterministic: the same input always yields the same blocks.
/// Top-level fenced code is lifted out as [`Block::Code`]; everything else is
/// rendered by comrak with raw HTML disabled and then passed through the
/// ammonia allow-list. Fences nested in lists or quotes are rendered through
/// [`CodeBlockRenderer`] in place and listed on their [`Block::Content`].
pub struct MarkdownPipeline {
    config: PipelineConfig,
    options: comrak::Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl MarkdownPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            options: default_options(),
            sanitizer: build_sanitizer(),
        }
    }

    pub fn render(&self, markdown: &str) -> Result<Vec<Block>, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        let mut blocks = Vec::new();
        for (position, node) in root.children().enumerate() {
            if position == 0 && self.config.suppress_leading_heading && is_leading_title(node) {
                continue;
            }

            if let Some(code) = extract_fenced_code(node) {
                blocks.push(Block::Code(code));
                continue;
            }

            let (html, code) = self.render_node(node)?;
            if !html.trim().is_empty() {
                blocks.push(Block::Content { html, code });
            }
        }

        Ok(blocks)
    }

    fn render_node<'a>(
        &self,
        node: &'a AstNode<'a>,
    ) -> Result<(String, Vec<CodeBlock>), RenderError> {
        let nested = take_nested_fences(node);

        let mut raw = String::new();
        format_html(node, &self.options, &mut raw).map_err(|err| RenderError::Markdown {
            message: err.to_string(),
        })?;
        let mut html = self.sanitizer.clean(&raw).to_string();

        for (slot, code) in nested.iter().enumerate() {
            let markup = CodeBlockRenderer::new(code.clone()).render();
            html = fill_code_slot(&html, slot, &markup).ok_or_else(|| RenderError::Markdown {
                message: format!("nested code block {slot} lost during sanitising"),
            })?;
        }
        Ok((html, nested))
    }
}

impl Default for MarkdownPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

fn is_leading_title(node: &AstNode<'_>) -> bool {
    let data = node.data.borrow();
    matches!(&data.value, NodeValue::Heading(heading) if heading.level == 1)
        && data.sourcepos.start.line == 1
}

/// Swap every fenced block below `node` for a slot marker and return the
/// lifted blocks in document order.
fn take_nested_fences<'a>(node: &'a AstNode<'a>) -> Vec<CodeBlock> {
    let mut lifted = Vec::new();
    for descendant in node.descendants().skip(1) {
        let Some(code) = extract_fenced_code(descendant) else {
            continue;
        };
        let mut data = descendant.data.borrow_mut();
        if let NodeValue::CodeBlock(block) = &mut data.value {
            block.info.clear();
            block.literal = slot_marker(lifted.len());
        }
        lifted.push(code);
    }
    lifted
}

fn slot_marker(slot: usize) -> String {
    format!("{SLOT_MARK}code-slot-{slot}{SLOT_MARK}")
}

/// Replace the `<pre>` element holding slot `slot` with `markup`.
fn fill_code_slot(html: &str, slot: usize, markup: &str) -> Option<String> {
    let marker = slot_marker(slot);
    let at = html.find(&marker)?;
    let start = html[..at].rfind("<pre")?;
    let end = at + html[at..].find("</pre>")? + "</pre>".len();

    let mut filled = String::with_capacity(html.len() + markup.len());
    filled.push_str(&html[..start]);
    filled.push_str(markup);
    filled.push_str(&html[end..]);
    Some(filled)
}

fn extract_fenced_code(node: &AstNode<'_>) -> Option<CodeBlock> {
    let data = node.data.borrow();
    let NodeValue::CodeBlock(block) = &data.value else {
        return None;
    };
    if !block.fenced {
        return None;
    }

    let language = block.info.split_whitespace().next();
    let text = block.literal.strip_suffix('\n').unwrap_or(&block.literal);
    Some(CodeBlock::new(language, text))
}
