//! GraphQL-backed [`ContentSource`].

use std::time::Duration;

use async_trait::async_trait;
use prepwise_api_types::{
    ArticleBySlugData, ArticlePayload, GraphqlRequest, GraphqlResponse, RelatedArticlePayload,
};
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::application::source::{ContentSource, FetchPolicy, SourceError};
use crate::domain::articles::{ArticleLevel, ArticleRecord, ArticleSlug, RelatedArticle};

use super::error::InfraError;

const TARGET: &str = "prepwise::infra::graphql";

#[derive(Clone, Debug)]
pub struct GraphqlContentSource {
    client: Client,
    endpoint: Url,
}

impl GraphqlContentSource {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self { client, endpoint })
    }

    pub fn user_agent() -> &'static str {
        concat!("prepwise/", env!("CARGO_PKG_VERSION"))
    }
}

#[async_trait]
impl ContentSource for GraphqlContentSource {
    async fn fetch(
        &self,
        slug: &ArticleSlug,
        policy: FetchPolicy,
    ) -> Result<Option<ArticleRecord>, SourceError> {
        debug!(target = TARGET, slug = %slug, ?policy, "querying article");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&GraphqlRequest::article_by_slug(slug.as_str()))
            .send()
            .await
            .map_err(SourceError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SourceError::transport(format!(
                "status {status} body {text}"
            )));
        }

        let body: GraphqlResponse<ArticleBySlugData> =
            response.json().await.map_err(SourceError::decode)?;

        if !body.errors.is_empty() {
            let message = body
                .errors
                .iter()
                .map(|error| error.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            warn!(target = TARGET, slug = %slug, error = %message, "graphql errors");
            return Err(SourceError::graphql(message));
        }

        body.data
            .and_then(|data| data.article_by_slug)
            .map(into_record)
            .transpose()
    }
}

fn into_record(payload: ArticlePayload) -> Result<ArticleRecord, SourceError> {
    let slug = ArticleSlug::parse(&payload.slug).map_err(SourceError::decode)?;
    // Unknown levels are dropped rather than failing the whole record.
    let level = payload
        .level
        .as_deref()
        .and_then(|value| value.parse::<ArticleLevel>().ok());
    let related_articles = payload
        .related_articles
        .into_iter()
        .map(into_related)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ArticleRecord {
        id: payload.id,
        slug,
        title: payload.title,
        level,
        taxonomy: payload.taxonomy,
        category: payload.category,
        tags: payload.tags,
        word_count: payload.word_count,
        excerpt: payload.excerpt,
        updated_at: payload.updated_at,
        is_generated: payload.is_generated,
        content: payload.content,
        related_articles,
    })
}

fn into_related(payload: RelatedArticlePayload) -> Result<RelatedArticle, SourceError> {
    Ok(RelatedArticle {
        id: payload.id,
        slug: ArticleSlug::parse(&payload.slug).map_err(SourceError::decode)?,
        title: payload.title,
        excerpt: payload.excerpt,
        taxonomy: payload.taxonomy,
        category: payload.category,
    })
}
