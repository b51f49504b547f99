//! Post catalog - every post's summary, newest first
//!
//! The catalog is rebuilt from storage on every request. Each post is
//! fetched independently; a post that cannot be read still shows up, just
//! without metadata.

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use super::{ContentLayout, Metadata, NavigationInfo, PostSummary};
use crate::config::FetchConfig;
use crate::storage::{ObjectStore, StorageError};

/// Errors that abort a catalog build
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to list posts under {prefix:?}: {source}")]
    Listing {
        prefix: String,
        #[source]
        source: StorageError,
    },

    #[error("catalog was not built within {0:?}")]
    Deadline(Duration),
}

/// Limits applied to the fetches of a catalog build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Timeout of a single object fetch
    pub timeout: Duration,
    /// Concurrent fetches, `None` for no limit
    pub max_concurrent: Option<usize>,
    /// Deadline for the whole build
    pub deadline: Duration,
}

impl From<&FetchConfig> for FetchPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_concurrent: (config.max_concurrent > 0).then_some(config.max_concurrent),
            deadline: config.catalog_deadline(),
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

/// Post summaries ordered newest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    posts: Vec<PostSummary>,
}

impl Catalog {
    /// Build a catalog from summaries in any order
    pub fn from_summaries(mut posts: Vec<PostSummary>) -> Self {
        sort_newest_first(&mut posts);
        Self { posts }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.posts.iter().position(|p| p.identifier == identifier)
    }

    /// Chronological neighbours of a post
    ///
    /// `prev` is the next older post, `next` the next newer one. Both are
    /// empty if the post is not in the catalog.
    pub fn navigation(&self, identifier: &str) -> NavigationInfo<'_> {
        let Some(pos) = self.position(identifier) else {
            return NavigationInfo::default();
        };

        NavigationInfo {
            prev: self.posts.get(pos + 1),
            next: pos.checked_sub(1).and_then(|i| self.posts.get(i)),
        }
    }
}

/// Sort by creation date descending, undated posts last, ties by identifier
fn sort_newest_first(posts: &mut [PostSummary]) {
    posts.sort_by_cached_key(|p| (std::cmp::Reverse(p.date()), p.identifier.clone()));
}

/// List, fetch and parse every post under the layout's prefix
pub async fn build_catalog(
    store: &dyn ObjectStore,
    layout: &ContentLayout,
    policy: &FetchPolicy,
) -> Result<Catalog, CatalogError> {
    match tokio::time::timeout(policy.deadline, collect_summaries(store, layout, policy)).await {
        Ok(result) => result.map(Catalog::from_summaries),
        Err(_) => Err(CatalogError::Deadline(policy.deadline)),
    }
}

async fn collect_summaries(
    store: &dyn ObjectStore,
    layout: &ContentLayout,
    policy: &FetchPolicy,
) -> Result<Vec<PostSummary>, CatalogError> {
    let keys: Vec<String> = store
        .list(&layout.prefix)
        .await
        .map_err(|source| CatalogError::Listing {
            prefix: layout.prefix.clone(),
            source,
        })?
        .into_iter()
        .filter(|key| layout.is_post_key(key))
        .collect();

    tracing::debug!("Fetching {} posts under {:?}", keys.len(), layout.prefix);

    let limit = policy.max_concurrent.unwrap_or(keys.len()).max(1);
    let summaries: Vec<PostSummary> = stream::iter(keys)
        .map(|key| fetch_summary(store, layout, key, policy.timeout))
        .buffer_unordered(limit)
        .collect()
        .await;

    Ok(summaries)
}

/// Fetch one post, degrading to empty metadata on any failure
async fn fetch_summary(
    store: &dyn ObjectStore,
    layout: &ContentLayout,
    key: String,
    timeout: Duration,
) -> PostSummary {
    let identifier = layout.identifier_for_key(&key).to_string();

    let metadata = match tokio::time::timeout(timeout, store.get(&key)).await {
        Ok(Ok(Some(data))) => {
            let text = String::from_utf8_lossy(&data);
            let (metadata, _) = Metadata::parse(&text);
            metadata
        }
        Ok(Ok(None)) => {
            tracing::debug!("Post {} disappeared while building the catalog", key);
            Metadata::default()
        }
        Ok(Err(e)) => {
            tracing::warn!("Failed to fetch post {}: {}", key, e);
            Metadata::default()
        }
        Err(_) => {
            tracing::warn!("Fetching post {} timed out after {:?}", key, timeout);
            Metadata::default()
        }
    };

    PostSummary::new(identifier, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;

    fn summary(id: &str, date: Option<&str>) -> PostSummary {
        let metadata = match date {
            Some(d) => [("creation_date", d)].into_iter().collect(),
            None => Metadata::default(),
        };
        PostSummary::new(id, metadata)
    }

    fn ids(catalog: &Catalog) -> Vec<&str> {
        catalog.posts().iter().map(|p| p.identifier.as_str()).collect()
    }

    fn post(date: &str, header: &str) -> String {
        format!("---\ncreation_date: {}\nheader: {}\n---\nBody of {}\n", date, header, header)
    }

    #[test]
    fn test_sort_newest_first() {
        let catalog = Catalog::from_summaries(vec![
            summary("a", Some("01/01/2024")),
            summary("c", Some("03/01/2024")),
            summary("old", Some("15/06/1965")),
            summary("b", Some("02/01/2024")),
        ]);
        assert_eq!(ids(&catalog), vec!["c", "b", "a", "old"]);

        let dates: Vec<_> = catalog.posts().iter().map(|p| p.date()).collect();
        assert!(dates.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_undated_posts_sort_last() {
        let catalog = Catalog::from_summaries(vec![
            summary("undated", None),
            summary("garbled", Some("next tuesday")),
            summary("ancient", Some("01/01/1900")),
            summary("recent", Some("01/01/2024")),
        ]);
        assert_eq!(ids(&catalog), vec!["recent", "ancient", "garbled", "undated"]);
    }

    #[test]
    fn test_equal_dates_break_ties_by_identifier() {
        let catalog = Catalog::from_summaries(vec![
            summary("zeta", Some("01/01/2024")),
            summary("alpha", Some("01/01/2024")),
            summary("mid", Some("1/1/2024")),
        ]);
        assert_eq!(ids(&catalog), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_navigation_middle() {
        let catalog = Catalog::from_summaries(vec![
            summary("c", Some("03/01/2024")),
            summary("b", Some("02/01/2024")),
            summary("a", Some("01/01/2024")),
        ]);

        let nav = catalog.navigation("b");
        assert_eq!(nav.prev.map(|p| p.identifier.as_str()), Some("a"));
        assert_eq!(nav.next.map(|p| p.identifier.as_str()), Some("c"));
    }

    #[test]
    fn test_navigation_boundaries() {
        let catalog = Catalog::from_summaries(vec![
            summary("c", Some("03/01/2024")),
            summary("b", Some("02/01/2024")),
            summary("a", Some("01/01/2024")),
        ]);

        let newest = catalog.navigation("c");
        assert!(newest.next.is_none());
        assert_eq!(newest.prev.map(|p| p.identifier.as_str()), Some("b"));

        let oldest = catalog.navigation("a");
        assert!(oldest.prev.is_none());
        assert_eq!(oldest.next.map(|p| p.identifier.as_str()), Some("b"));

        assert_eq!(catalog.navigation("missing"), NavigationInfo::default());
    }

    #[test]
    fn test_navigation_single_and_empty() {
        let single = Catalog::from_summaries(vec![summary("only", None)]);
        assert_eq!(single.navigation("only"), NavigationInfo::default());
        assert_eq!(Catalog::default().navigation("only"), NavigationInfo::default());
    }

    #[tokio::test]
    async fn test_build_catalog_from_store() {
        let store: MemoryStore = [
            ("webblog/first.md", post("01/01/2024", "First")),
            ("webblog/second.md", post("02/01/2024", "Second")),
            ("webblog/notes/third.md", post("03/01/2024", "Third")),
            ("webblog/cover.png", "not a post".to_string()),
            ("drafts/unpublished.md", post("04/01/2024", "Draft")),
        ]
        .into_iter()
        .collect();

        let catalog = build_catalog(&store, &ContentLayout::default(), &FetchPolicy::default())
            .await
            .unwrap();

        assert_eq!(ids(&catalog), vec!["notes/third", "second", "first"]);
        assert_eq!(catalog.posts()[0].metadata.header(), Some("Third"));
    }

    #[tokio::test]
    async fn test_build_catalog_empty_prefix() {
        let store = MemoryStore::new();
        let catalog = build_catalog(&store, &ContentLayout::default(), &FetchPolicy::default())
            .await
            .unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_build_catalog_with_concurrency_limit() {
        let store: MemoryStore = (1..=9)
            .map(|day| {
                (
                    format!("webblog/day{}.md", day),
                    post(&format!("0{}/03/2024", day), &format!("Day {}", day)),
                )
            })
            .collect();
        let policy = FetchPolicy {
            max_concurrent: Some(2),
            ..FetchPolicy::default()
        };

        let catalog = build_catalog(&store, &ContentLayout::default(), &policy)
            .await
            .unwrap();
        assert_eq!(catalog.len(), 9);
        assert_eq!(catalog.posts()[0].identifier, "day9");
        assert_eq!(catalog.posts()[8].identifier, "day1");
    }

    /// Store whose listing is stale and whose objects can misbehave
    struct FlakyStore {
        inner: MemoryStore,
        listed: Vec<String>,
    }

    #[async_trait]
    impl ObjectStore for FlakyStore {
        async fn list(&self, _prefix: &str) -> Result<Vec<String>, StorageError> {
            Ok(self.listed.clone())
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            if key.contains("broken") {
                return Err(StorageError::Backend("boom".to_string()));
            }
            if key.contains("slow") {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.inner.get(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_fetches_keep_entry_without_metadata() {
        let inner = MemoryStore::new();
        inner.insert("webblog/ok.md", post("01/01/2024", "Ok"));
        inner.insert("webblog/slow.md", post("05/01/2024", "Slow"));
        let store = FlakyStore {
            inner,
            listed: vec![
                "webblog/ok.md".to_string(),
                "webblog/deleted.md".to_string(),
                "webblog/broken.md".to_string(),
                "webblog/slow.md".to_string(),
            ],
        };
        let policy = FetchPolicy {
            timeout: Duration::from_millis(50),
            ..FetchPolicy::default()
        };

        let catalog = build_catalog(&store, &ContentLayout::default(), &policy)
            .await
            .unwrap();

        assert_eq!(ids(&catalog), vec!["ok", "broken", "deleted", "slow"]);
        assert!(catalog.posts()[1..].iter().all(|p| p.metadata.is_empty()));
    }

    #[tokio::test]
    async fn test_catalog_deadline() {
        let inner = MemoryStore::new();
        inner.insert("webblog/slow.md", post("05/01/2024", "Slow"));
        let store = FlakyStore {
            inner,
            listed: vec!["webblog/slow.md".to_string()],
        };
        let policy = FetchPolicy {
            timeout: Duration::from_secs(120),
            max_concurrent: None,
            deadline: Duration::from_millis(50),
        };

        let result = build_catalog(&store, &ContentLayout::default(), &policy).await;
        assert!(matches!(result, Err(CatalogError::Deadline(_))));
    }

    struct UnlistableStore;

    #[async_trait]
    impl ObjectStore for UnlistableStore {
        async fn list(&self, _prefix: &str) -> Result<Vec<String>, StorageError> {
            Err(StorageError::Backend("bucket offline".to_string()))
        }

        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let result =
            build_catalog(&UnlistableStore, &ContentLayout::default(), &FetchPolicy::default())
                .await;
        assert!(matches!(result, Err(CatalogError::Listing { .. })));
    }
}
