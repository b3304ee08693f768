//! Wire types exchanged with the article GraphQL backend.
//!
//! Field names follow the backend schema (camelCase). The main crate converts
//! these payloads into domain records; nothing here carries behaviour beyond
//! serialisation.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Query used to load a single article, including its related summaries.
pub const ARTICLE_BY_SLUG_QUERY: &str = r#"query ArticleBySlug($slug: String!) {
  articleBySlug(slug: $slug) {
    id
    title
    slug
    level
    taxonomy
    category
    tags
    content
    excerpt
    isGenerated
    wordCount
    updatedAt
    relatedArticles {
      id
      title
      slug
      excerpt
      taxonomy
      category
    }
  }
}"#;

/// Operation name sent alongside [`ARTICLE_BY_SLUG_QUERY`].
pub const ARTICLE_BY_SLUG_OPERATION: &str = "ArticleBySlug";

/// GraphQL POST body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    pub variables: Map<String, Value>,
}

impl GraphqlRequest {
    pub fn article_by_slug(slug: &str) -> Self {
        let mut variables = Map::new();
        variables.insert("slug".to_string(), Value::String(slug.to_string()));
        Self {
            query: ARTICLE_BY_SLUG_QUERY.to_string(),
            operation_name: Some(ARTICLE_BY_SLUG_OPERATION.to_string()),
            variables,
        }
    }
}

/// GraphQL response envelope. Both members may be present at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlErrorPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphqlErrorPayload {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Value>,
}

/// `data` member of the `articleBySlug` response. A `null` article means the
/// slug did not resolve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleBySlugData {
    pub article_by_slug: Option<ArticlePayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePayload {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub level: Option<String>,
    pub taxonomy: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub is_generated: bool,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub related_articles: Vec<RelatedArticlePayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedArticlePayload {
    pub id: i64,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub excerpt: Option<String>,
    pub taxonomy: String,
    pub category: String,
}
