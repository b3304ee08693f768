//! Article records observed from the content backend.
//!
//! Records are immutable snapshots: every fetch produces a fresh value and the
//! core never mutates one in place. The only transition that matters here is
//! `is_generated` flipping from `false` to `true` upstream.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::error::DomainError;

/// Stable identifier locating one article (the backend slug).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ArticleSlug(String);

impl ArticleSlug {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("article slug must not be empty"));
        }

        if let Some(bad) = trimmed
            .chars()
            .find(|ch| ch.is_whitespace() || matches!(ch, '/' | '?' | '#'))
        {
            return Err(DomainError::validation(format!(
                "article slug `{trimmed}` contains forbidden character {bad:?}"
            )));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ArticleSlug {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ArticleSlug {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleLevel {
    Basic,
    Intermediate,
    Advanced,
}

impl ArticleLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ArticleLevel::Basic => "basic",
            ArticleLevel::Intermediate => "intermediate",
            ArticleLevel::Advanced => "advanced",
        }
    }
}

impl FromStr for ArticleLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(ArticleLevel::Basic),
            "intermediate" => Ok(ArticleLevel::Intermediate),
            "advanced" => Ok(ArticleLevel::Advanced),
            other => Err(DomainError::validation(format!(
                "unknown article level `{other}`"
            ))),
        }
    }
}

/// Lightweight summary shown in the related-articles list. Never carries a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedArticle {
    pub id: i64,
    pub slug: ArticleSlug,
    pub title: String,
    pub excerpt: Option<String>,
    pub taxonomy: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub slug: ArticleSlug,
    pub title: String,
    pub level: Option<ArticleLevel>,
    pub taxonomy: String,
    pub category: String,
    pub tags: Vec<String>,
    pub word_count: u32,
    pub excerpt: Option<String>,
    pub updated_at: Option<String>,
    pub is_generated: bool,
    /// Markdown body. Untrusted, and possibly partial while `is_generated` is false.
    pub content: Option<String>,
    pub related_articles: Vec<RelatedArticle>,
}

impl ArticleRecord {
    /// Copy of the record with the body dropped, safe to keep around while the
    /// article is still being generated.
    pub fn without_content(&self) -> Self {
        Self {
            content: None,
            ..self.clone()
        }
    }

    /// Final body text. `None` until the record is generated.
    pub fn final_content(&self) -> Option<&str> {
        if self.is_generated {
            self.content.as_deref()
        } else {
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn article(slug: &str, is_generated: bool, content: Option<&str>) -> ArticleRecord {
        ArticleRecord {
            id: 1,
            slug: ArticleSlug::parse(slug).expect("valid slug"),
            title: "Two Sum".to_string(),
            level: Some(ArticleLevel::Basic),
            taxonomy: "algorithms".to_string(),
            category: "arrays".to_string(),
            tags: vec!["hash-map".to_string(), "array".to_string()],
            word_count: 420,
            excerpt: Some("Find two numbers that add up to a target.".to_string()),
            updated_at: None,
            is_generated,
            content: content.map(str::to_string),
            related_articles: Vec::new(),
        }
    }
}
