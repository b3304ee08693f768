//! Client-side query cache in front of a [`ContentSource`].

use std::{num::NonZeroUsize, sync::Mutex, time::Duration};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use crate::application::source::{ContentSource, FetchPolicy, SourceError};
use crate::domain::articles::{ArticleRecord, ArticleSlug};

use super::lock::mutex_lock;

const SOURCE: &str = "infra::cache";

struct Entry {
    record: ArticleRecord,
    fetched_at: Instant,
}

/// Caches the last observed record per slug.
///
/// `CacheFirst` serves any cached record. `NetworkOnly` always reaches the
/// inner source unless the cached record is younger than the minimum refetch
/// interval. Not-found results evict the slug; errors leave the cache alone.
pub struct CachedContentSource<S> {
    inner: S,
    entries: Mutex<LruCache<ArticleSlug, Entry>>,
    min_refetch_interval: Duration,
}

impl<S> CachedContentSource<S> {
    pub fn new(inner: S, capacity: NonZeroUsize, min_refetch_interval: Duration) -> Self {
        Self {
            inner,
            entries: Mutex::new(LruCache::new(capacity)),
            min_refetch_interval,
        }
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, slug: &ArticleSlug, policy: FetchPolicy) -> Option<ArticleRecord> {
        let mut entries = mutex_lock(&self.entries, SOURCE, "lookup");
        let entry = entries.get(slug)?;
        let usable = match policy {
            FetchPolicy::CacheFirst => true,
            FetchPolicy::NetworkOnly => entry.fetched_at.elapsed() < self.min_refetch_interval,
        };
        usable.then(|| entry.record.clone())
    }

    fn store(&self, slug: &ArticleSlug, record: Option<&ArticleRecord>) {
        let mut entries = mutex_lock(&self.entries, SOURCE, "store");
        match record {
            Some(record) => {
                entries.put(
                    slug.clone(),
                    Entry {
                        record: record.clone(),
                        fetched_at: Instant::now(),
                    },
                );
            }
            None => {
                entries.pop(slug);
            }
        }
    }
}

#[async_trait]
impl<S> ContentSource for CachedContentSource<S>
where
    S: ContentSource,
{
    async fn fetch(
        &self,
        slug: &ArticleSlug,
        policy: FetchPolicy,
    ) -> Result<Option<ArticleRecord>, SourceError> {
        if let Some(record) = self.lookup(slug, policy) {
            counter!("prepwise_query_cache_hit_total").increment(1);
            debug!(target = SOURCE, slug = %slug, ?policy, outcome = "hit", "query cache");
            return Ok(Some(record));
        }

        counter!("prepwise_query_cache_miss_total").increment(1);
        debug!(target = SOURCE, slug = %slug, ?policy, outcome = "miss", "query cache");

        let result = self.inner.fetch(slug, policy).await?;
        self.store(slug, result.as_ref());
        Ok(result)
    }
}
