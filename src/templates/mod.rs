//! Page templates using the Tera template engine
//!
//! The theme is embedded in the binary. Every value coming from a post's
//! front-matter is escaped by Tera; only the rendered body is inserted
//! verbatim.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{Catalog, Metadata, NavigationInfo, PostSummary};
use crate::helpers::{display_date, html_escape, post_href};

/// Page renderer with the embedded theme
pub struct PageRenderer {
    tera: Tera,
    site: SiteData,
}

/// A post page ready to be composed
#[derive(Debug, Clone)]
pub struct PostPage<'a> {
    pub identifier: &'a str,
    pub metadata: &'a Metadata,
    pub body_html: &'a str,
    /// `None` when the post is not in the catalog
    pub navigation: Option<NavigationInfo<'a>>,
}

impl PostPage<'_> {
    /// Page title: the header, falling back to the identifier
    pub fn title(&self) -> &str {
        self.metadata.header().unwrap_or(self.identifier)
    }
}

impl PageRenderer {
    /// Create a new renderer with all theme templates loaded
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let mut tera = Tera::default();

        // Tera's default escaper also rewrites `/`, which mangles dates and links
        tera.set_escape_fn(html_escape);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("theme/layout.html")),
            ("index.html", include_str!("theme/index.html")),
            ("post.html", include_str!("theme/post.html")),
            ("message.html", include_str!("theme/message.html")),
            // Partials
            (
                "partials/head.html",
                include_str!("theme/partials/head.html"),
            ),
            ("partials/nav.html", include_str!("theme/partials/nav.html")),
            (
                "partials/scripts.html",
                include_str!("theme/partials/scripts.html"),
            ),
        ])?;

        // Register custom filters
        tera.register_filter("display_date", display_date_filter);
        tera.register_filter("post_href", post_href_filter);

        Ok(Self {
            tera,
            site: SiteData::from(config),
        })
    }

    /// Homepage listing every post in catalog order
    pub fn listing(&self, catalog: &Catalog) -> Result<String> {
        let posts: Vec<ListingEntry> = catalog.posts().iter().map(ListingEntry::from).collect();

        let mut context = self.base_context(&self.site.title, &self.site.title);
        context.insert("posts", &posts);
        self.render("index.html", &context)
    }

    /// A single post with its byline and navigation
    pub fn post(&self, page: &PostPage<'_>) -> Result<String> {
        let title = page.title();
        let byline = Byline {
            subheader: page.metadata.subheader(),
            creator: page.metadata.creator(),
            date: page.metadata.creation_date(),
        };

        let mut context = self.base_context(title, title);
        context.insert("post", &byline);
        context.insert("body", page.body_html);
        context.insert("nav", &page.navigation);
        self.render("post.html", &context)
    }

    /// Placeholder shown when the requested post does not exist
    pub fn not_found(&self, identifier: &str) -> Result<String> {
        let mut context = self.base_context(identifier, identifier);
        context.insert("message", "File not found");
        self.render("message.html", &context)
    }

    /// Page explaining a request-level failure
    pub fn error(&self, message: &str) -> Result<String> {
        let mut context = self.base_context(&self.site.title, "Something went wrong");
        context.insert("message", message);
        self.render("message.html", &context)
    }

    fn base_context(&self, title: &str, heading: &str) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("title", title);
        context.insert("heading", heading);
        context
    }

    fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: reverse the parts of a `DD/MM/YYYY` date
fn display_date_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("display_date", "value", String, value);
    Ok(tera::Value::String(display_date(&s)))
}

/// Tera filter: link to a post identifier
fn post_href_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("post_href", "value", String, value);
    Ok(tera::Value::String(post_href(&s)))
}

// Data structures for template context

#[derive(Debug, Clone, Serialize)]
struct SiteData {
    title: String,
    listing_heading: String,
    language: String,
}

impl From<&SiteConfig> for SiteData {
    fn from(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            listing_heading: config.listing_heading.clone(),
            language: config.language.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ListingEntry<'a> {
    href: String,
    title: &'a str,
    subheader: Option<&'a str>,
    creator: Option<&'a str>,
    date: Option<&'a str>,
}

impl<'a> From<&'a PostSummary> for ListingEntry<'a> {
    fn from(post: &'a PostSummary) -> Self {
        Self {
            href: post.href(),
            title: post.title(),
            subheader: post.metadata.subheader(),
            creator: post.metadata.creator(),
            date: post.metadata.creation_date(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct Byline<'a> {
    subheader: Option<&'a str>,
    creator: Option<&'a str>,
    date: Option<&'a str>,
}
