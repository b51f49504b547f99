//! Content module - front-matter, posts, the catalog and Markdown rendering

pub mod catalog;
mod frontmatter;
mod markdown;
mod post;

pub use catalog::{build_catalog, Catalog, CatalogError, FetchPolicy};
pub use frontmatter::{Metadata, RECOGNIZED_KEYS};
pub use markdown::MarkdownRenderer;
pub use post::{ContentLayout, NavigationInfo, PostSummary};
