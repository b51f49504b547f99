//! Generator module - turns a request path into a finished HTML page
//!
//! Every call starts from storage: the catalog is rebuilt, the requested
//! post is fetched and rendered, and nothing is kept between calls.

use anyhow::Result;
use axum::http::StatusCode;
use std::sync::Arc;

use crate::config::SiteConfig;
use crate::content::{
    build_catalog, Catalog, CatalogError, ContentLayout, FetchPolicy, MarkdownRenderer, Metadata,
};
use crate::helpers::html_escape;
use crate::storage::{ObjectStore, StorageError};
use crate::templates::{PageRenderer, PostPage};

/// A composed page and the status it should be served with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub status: StatusCode,
    pub html: String,
}

/// Builds pages from the object store
pub struct Generator {
    config: SiteConfig,
    store: Arc<dyn ObjectStore>,
    markdown: Arc<MarkdownRenderer>,
    pages: PageRenderer,
    layout: ContentLayout,
    policy: FetchPolicy,
}

impl Generator {
    /// Create a new generator
    pub fn new(config: SiteConfig, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let markdown = Arc::new(MarkdownRenderer::from_config(&config.highlight));
        let pages = PageRenderer::new(&config)?;
        let layout = ContentLayout::from(&config.content);
        let policy = FetchPolicy::from(&config.fetch);

        Ok(Self {
            config,
            store,
            markdown,
            pages,
            layout,
            policy,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Build the catalog from the current state of storage
    pub async fn catalog(&self) -> Result<Catalog, CatalogError> {
        build_catalog(self.store.as_ref(), &self.layout, &self.policy).await
    }

    /// Render the page for a decoded request path without leading slashes
    ///
    /// An empty path is the homepage listing; anything else names a post,
    /// with or without the content extension.
    pub async fn render_path(&self, path: &str) -> RenderedPage {
        if path.is_empty() {
            self.render_home().await
        } else {
            self.render_post(path).await
        }
    }

    async fn render_home(&self) -> RenderedPage {
        match self.catalog().await {
            Ok(catalog) => {
                tracing::debug!("Listing {} posts", catalog.len());
                self.compose(StatusCode::OK, self.pages.listing(&catalog))
            }
            Err(e) => self.catalog_failure(e),
        }
    }

    async fn render_post(&self, path: &str) -> RenderedPage {
        let key = self.layout.key_for_path(path);
        let identifier = self.layout.identifier_for_path(path);

        let (catalog, object) = tokio::join!(self.catalog(), self.fetch_post(&key));

        let data = match object {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!("Post {} not found", key);
                return self.not_found(identifier);
            }
            Err(PostFetchError::Storage(StorageError::InvalidKey(_))) => {
                tracing::debug!("Rejected post key {:?}", key);
                return self.not_found(identifier);
            }
            Err(PostFetchError::Storage(e)) => {
                tracing::error!("Failed to fetch post {}: {}", key, e);
                return self.error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "This post could not be loaded.",
                );
            }
            Err(PostFetchError::Timeout) => {
                tracing::error!("Fetching post {} timed out", key);
                return self.error_page(
                    StatusCode::GATEWAY_TIMEOUT,
                    "This post took too long to load.",
                );
            }
        };

        // The post still renders when only its neighbours are unavailable
        let catalog = catalog
            .map_err(|e| tracing::warn!("Rendering {} without navigation: {}", identifier, e))
            .ok();

        let text = String::from_utf8_lossy(&data);
        let (metadata, body) = Metadata::parse(&text);
        let body_html = self.render_body(body.to_string()).await;

        let page = PostPage {
            identifier,
            metadata: &metadata,
            body_html: &body_html,
            navigation: catalog
                .as_ref()
                .filter(|c| c.position(identifier).is_some())
                .map(|c| c.navigation(identifier)),
        };
        self.compose(StatusCode::OK, self.pages.post(&page))
    }

    async fn fetch_post(&self, key: &str) -> Result<Option<Vec<u8>>, PostFetchError> {
        match tokio::time::timeout(self.policy.timeout, self.store.get(key)).await {
            Ok(result) => result.map_err(PostFetchError::Storage),
            Err(_) => Err(PostFetchError::Timeout),
        }
    }

    async fn render_body(&self, body: String) -> String {
        let markdown = Arc::clone(&self.markdown);
        render_or_raw(body, move |source| markdown.render(source)).await
    }

    fn not_found(&self, identifier: &str) -> RenderedPage {
        let status = if self.config.strict_not_found {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        };
        self.compose(status, self.pages.not_found(identifier))
    }

    fn catalog_failure(&self, error: CatalogError) -> RenderedPage {
        tracing::error!("Failed to build catalog: {}", error);
        match error {
            CatalogError::Listing { .. } => self.error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "The list of posts could not be loaded.",
            ),
            CatalogError::Deadline(_) => self.error_page(
                StatusCode::GATEWAY_TIMEOUT,
                "The list of posts took too long to load.",
            ),
        }
    }

    /// HTML page explaining a failure
    pub fn error_page(&self, status: StatusCode, message: &str) -> RenderedPage {
        self.compose(status, self.pages.error(message))
    }

    fn compose(&self, status: StatusCode, html: Result<String>) -> RenderedPage {
        match html {
            Ok(html) => RenderedPage { status, html },
            Err(e) => {
                tracing::error!("Template rendering failed: {:#}", e);
                RenderedPage {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    html: fallback_page(&self.config.title),
                }
            }
        }
    }
}

enum PostFetchError {
    Storage(StorageError),
    Timeout,
}

/// Render Markdown off the async workers, degrading to escaped text
async fn render_or_raw<F>(body: String, render: F) -> String
where
    F: FnOnce(&str) -> Result<String> + Send + 'static,
{
    let source = body.clone();

    match tokio::task::spawn_blocking(move || render(&source)).await {
        Ok(Ok(html)) => html,
        Ok(Err(e)) => {
            tracing::warn!("Markdown rendering failed, serving raw text: {}", e);
            raw_body(&body)
        }
        Err(e) => {
            tracing::error!("Markdown renderer crashed, serving raw text: {}", e);
            raw_body(&body)
        }
    }
}

fn raw_body(body: &str) -> String {
    format!("<pre>{}</pre>", html_escape(body))
}

/// Bare page used when the theme itself fails to render
fn fallback_page(title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"UTF-8\"><title>{}</title></head>\
         <body><p>This page could not be rendered.</p><p><a href=\"/\">Home</a></p></body></html>",
        html_escape(title)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FetchConfig;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    fn post(date: &str, header: &str, body: &str) -> String {
        format!("---\ncreation_date: {}\nheader: {}\n---\n{}", date, header, body)
    }

    fn sample_store() -> MemoryStore {
        [
            ("webblog/first.md", post("01/01/2024", "First", "# One\n\nfirst body")),
            ("webblog/second.md", post("02/01/2024", "Second", "second *body*")),
            ("webblog/third.md", post("03/01/2024", "Third", "third body")),
        ]
        .into_iter()
        .collect()
    }

    fn generator_with(store: MemoryStore, config: SiteConfig) -> Generator {
        Generator::new(config, Arc::new(store)).unwrap()
    }

    fn generator(store: MemoryStore) -> Generator {
        generator_with(store, SiteConfig::default())
    }

    #[tokio::test]
    async fn test_home_lists_posts_newest_first() {
        let page = generator(sample_store()).render_path("").await;
        assert_eq!(page.status, StatusCode::OK);

        let third = page.html.find("<h2>Third</h2>").unwrap();
        let second = page.html.find("<h2>Second</h2>").unwrap();
        let first = page.html.find("<h2>First</h2>").unwrap();
        assert!(third < second && second < first);
    }

    #[tokio::test]
    async fn test_home_with_empty_store() {
        let page = generator(MemoryStore::new()).render_path("").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.html.contains("Blog Posts"));
    }

    #[tokio::test]
    async fn test_post_renders_body_and_navigation() {
        let page = generator(sample_store()).render_path("second").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.html.contains("<title>Second</title>"));
        assert!(page.html.contains("<em>body</em>"));
        assert!(page.html.contains(r#"<a href="/first" class="nav-button prev-post">"#));
        assert!(page.html.contains(r#"<a href="/third" class="nav-button next-post">"#));
    }

    #[tokio::test]
    async fn test_post_path_with_extension() {
        let gen = generator(sample_store());
        let with_ext = gen.render_path("first.md").await;
        let without_ext = gen.render_path("first").await;
        assert_eq!(with_ext, without_ext);
        assert!(with_ext.html.contains(r#"<h1 id="one">"#));
    }

    #[tokio::test]
    async fn test_missing_post() {
        let page = generator(sample_store()).render_path("nope").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.html.contains("File not found"));
        assert!(!page.html.contains(r#"<nav class="blog-navigation">"#));

        let config = SiteConfig {
            strict_not_found: true,
            ..SiteConfig::default()
        };
        let page = generator_with(sample_store(), config).render_path("nope").await;
        assert_eq!(page.status, StatusCode::NOT_FOUND);
        assert!(page.html.contains("File not found"));
    }

    #[tokio::test]
    async fn test_post_without_front_matter() {
        let store = sample_store();
        store.insert("webblog/plain.md", "Just text, no metadata.");
        let page = generator(store).render_path("plain").await;
        assert!(page.html.contains("<title>plain</title>"));
        assert!(page.html.contains("Just text, no metadata."));
        // Undated posts sort last, so the oldest dated post is the newer neighbour
        assert!(page.html.contains(r#"<a href="/first" class="nav-button next-post">"#));
    }

    #[test]
    fn test_raw_body_is_escaped() {
        assert_eq!(raw_body("<b>x</b>"), "<pre>&lt;b&gt;x&lt;/b&gt;</pre>");
    }

    #[tokio::test]
    async fn test_render_failure_serves_raw_text() {
        let html = render_or_raw("# <b>x</b>".to_string(), |_| {
            Err(anyhow::anyhow!("renderer broke"))
        })
        .await;
        assert_eq!(html, "<pre># &lt;b&gt;x&lt;/b&gt;</pre>");

        let html = render_or_raw("a & b".to_string(), |_| -> Result<String> {
            panic!("renderer panicked")
        })
        .await;
        assert_eq!(html, "<pre>a &amp; b</pre>");

        let html = render_or_raw("ok".to_string(), |s| Ok(format!("<p>{}</p>", s))).await;
        assert_eq!(html, "<p>ok</p>");
    }

    /// Store whose listing or fetches can be made to fail or stall
    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryStore,
        unlistable: bool,
        slow_listing: bool,
        broken_gets: bool,
    }

    #[async_trait]
    impl ObjectStore for FaultyStore {
        async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
            if self.unlistable {
                return Err(StorageError::Backend("bucket offline".to_string()));
            }
            if self.slow_listing {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            self.inner.list(prefix).await
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            if self.broken_gets {
                return Err(StorageError::Backend("disk on fire".to_string()));
            }
            self.inner.get(key).await
        }
    }

    fn faulty_generator(store: FaultyStore) -> Generator {
        let config = SiteConfig {
            fetch: FetchConfig {
                catalog_deadline_ms: 50,
                ..FetchConfig::default()
            },
            ..SiteConfig::default()
        };
        Generator::new(config, Arc::new(store)).unwrap()
    }

    #[tokio::test]
    async fn test_listing_failure_on_home_is_500() {
        let store = FaultyStore {
            inner: sample_store(),
            unlistable: true,
            ..FaultyStore::default()
        };
        let page = faulty_generator(store).render_path("").await;
        assert_eq!(page.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(page.html.starts_with("<!DOCTYPE html>"));
        assert!(page.html.contains("The list of posts could not be loaded."));
        assert!(!page.html.contains("<h2>Third</h2>"));
    }

    #[tokio::test]
    async fn test_catalog_deadline_on_home_is_504() {
        let store = FaultyStore {
            inner: sample_store(),
            slow_listing: true,
            ..FaultyStore::default()
        };
        let page = faulty_generator(store).render_path("").await;
        assert_eq!(page.status, StatusCode::GATEWAY_TIMEOUT);
        assert!(page.html.contains("The list of posts took too long to load."));
    }

    #[tokio::test]
    async fn test_post_renders_without_navigation_when_listing_fails() {
        let store = FaultyStore {
            inner: sample_store(),
            unlistable: true,
            ..FaultyStore::default()
        };
        let page = faulty_generator(store).render_path("second").await;
        assert_eq!(page.status, StatusCode::OK);
        assert!(page.html.contains("<title>Second</title>"));
        assert!(page.html.contains("<em>body</em>"));
        assert!(!page.html.contains(r#"<nav class="blog-navigation">"#));
    }

    #[tokio::test]
    async fn test_post_storage_error_is_500() {
        let store = FaultyStore {
            inner: sample_store(),
            broken_gets: true,
            ..FaultyStore::default()
        };
        let page = faulty_generator(store).render_path("second").await;
        assert_eq!(page.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(page.html.contains("This post could not be loaded."));
        assert!(!page.html.contains("second *body*"));
        assert!(!page.html.contains("File not found"));
    }
}
