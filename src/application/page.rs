//! Article page model: metadata chips, rendered body and related summaries.

use std::sync::Arc;

use serde::Serialize;

use crate::application::render::{Block, CodeBlockRenderer, MarkdownPipeline, RenderError};
use crate::domain::articles::{ArticleRecord, RelatedArticle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChipKind {
    Taxonomy,
    Category,
    Level,
    Tag,
    WordCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataChip {
    pub kind: ChipKind,
    pub label: String,
}

/// Everything a view needs to display one ready article.
#[derive(Debug, Clone)]
pub struct ArticlePage {
    pub article: Arc<ArticleRecord>,
    pub chips: Vec<MetadataChip>,
    pub blocks: Vec<Block>,
}

impl ArticlePage {
    /// Build the page for `article`. The body is rendered only when the record
    /// is generated; otherwise the page carries metadata alone.
    pub fn build(
        article: Arc<ArticleRecord>,
        pipeline: &MarkdownPipeline,
    ) -> Result<Self, RenderError> {
        let blocks = match article.final_content() {
            Some(markdown) => pipeline.render(markdown)?,
            None => Vec::new(),
        };
        let chips = metadata_chips(&article);

        Ok(Self {
            article,
            chips,
            blocks,
        })
    }

    pub fn related(&self) -> &[RelatedArticle] {
        &self.article.related_articles
    }

    /// One renderer per fenced code block, nested ones included, in document
    /// order.
    pub fn code_renderers(&self) -> Vec<CodeBlockRenderer> {
        self.blocks
            .iter()
            .flat_map(Block::code_blocks)
            .cloned()
            .map(CodeBlockRenderer::new)
            .collect()
    }

    /// Body blocks concatenated into one HTML fragment.
    pub fn body_html(&self) -> String {
        blocks_html(&self.blocks)
    }
}

/// Concatenate rendered blocks, routing code through [`CodeBlockRenderer`].
pub fn blocks_html(blocks: &[Block]) -> String {
    let mut html = String::new();
    for block in blocks {
        match block {
            Block::Content { html: fragment, .. } => html.push_str(fragment),
            Block::Code(code) => {
                html.push_str(&CodeBlockRenderer::new(code.clone()).render());
                html.push('\n');
            }
        }
    }
    html
}

fn metadata_chips(article: &ArticleRecord) -> Vec<MetadataChip> {
    let mut chips = vec![
        MetadataChip {
            kind: ChipKind::Taxonomy,
            label: article.taxonomy.clone(),
        },
        MetadataChip {
            kind: ChipKind::Category,
            label: article.category.clone(),
        },
    ];
    if let Some(level) = article.level {
        chips.push(MetadataChip {
            kind: ChipKind::Level,
            label: level.as_str().to_string(),
        });
    }
    chips.extend(article.tags.iter().map(|tag| MetadataChip {
        kind: ChipKind::Tag,
        label: tag.clone(),
    }));
    chips.push(MetadataChip {
        kind: ChipKind::WordCount,
        label: format!("{} words", article.word_count),
    });
    chips
}
