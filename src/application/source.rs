//! Content source port: fetch-by-slug with an explicit freshness policy.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::articles::{ArticleRecord, ArticleSlug};

/// How a fetch may use previously observed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Serve a cached snapshot when one exists, otherwise hit the network.
    CacheFirst,
    /// Always ask the backend, subject to the source's minimum re-invocation
    /// interval.
    NetworkOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Graphql(String),
    #[error("failed to decode article response: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn graphql(message: impl Into<String>) -> Self {
        Self::Graphql(message.into())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Result of a single fetch as seen by the readiness machine.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(ArticleRecord),
    NotFound,
    Transport(String),
}

impl From<Result<Option<ArticleRecord>, SourceError>> for FetchOutcome {
    fn from(result: Result<Option<ArticleRecord>, SourceError>) -> Self {
        match result {
            Ok(Some(record)) => FetchOutcome::Found(record),
            Ok(None) => FetchOutcome::NotFound,
            Err(err) => FetchOutcome::Transport(err.to_string()),
        }
    }
}

/// Query interface keyed by article slug. `Ok(None)` means "not found".
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(
        &self,
        slug: &ArticleSlug,
        policy: FetchPolicy,
    ) -> Result<Option<ArticleRecord>, SourceError>;
}

#[async_trait]
impl<S> ContentSource for std::sync::Arc<S>
where
    S: ContentSource + ?Sized,
{
    async fn fetch(
        &self,
        slug: &ArticleSlug,
        policy: FetchPolicy,
    ) -> Result<Option<ArticleRecord>, SourceError> {
        (**self).fetch(slug, policy).await
    }
}
