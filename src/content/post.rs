//! Post models

use chrono::NaiveDate;
use serde::Serialize;

use super::Metadata;
use crate::config::ContentConfig;
use crate::helpers::post_href;

/// Lightweight view of a post used for listings and navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    /// Storage key without prefix and extension, also the URL path
    pub identifier: String,

    /// Front-matter of the post, empty if it could not be read
    pub metadata: Metadata,
}

impl PostSummary {
    pub fn new(identifier: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            identifier: identifier.into(),
            metadata,
        }
    }

    /// Ordering date, `None` when missing or unparsable
    pub fn date(&self) -> Option<NaiveDate> {
        self.metadata.parsed_creation_date()
    }

    /// Display title: the header, falling back to the identifier
    pub fn title(&self) -> &str {
        self.metadata.header().unwrap_or(&self.identifier)
    }

    pub fn href(&self) -> String {
        post_href(&self.identifier)
    }
}

/// Chronological neighbours of a post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NavigationInfo<'a> {
    /// Older post
    pub prev: Option<&'a PostSummary>,
    /// Newer post
    pub next: Option<&'a PostSummary>,
}

/// Mapping between storage keys, identifiers and request paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLayout {
    pub prefix: String,
    pub extension: String,
}

impl ContentLayout {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// Whether a listed key holds a post
    pub fn is_post_key(&self, key: &str) -> bool {
        key.starts_with(&self.prefix) && key.ends_with(&self.extension)
    }

    /// Identifier of a storage key
    ///
    /// # Examples
    /// ```ignore
    /// layout.identifier_for_key("webblog/notes/hello.md") // -> "notes/hello"
    /// ```
    pub fn identifier_for_key<'k>(&self, key: &'k str) -> &'k str {
        let key = key.strip_prefix(&self.prefix).unwrap_or(key);
        key.strip_suffix(&self.extension).unwrap_or(key)
    }

    /// Identifier of a request path, with or without the extension
    pub fn identifier_for_path<'p>(&self, path: &'p str) -> &'p str {
        path.strip_suffix(&self.extension).unwrap_or(path)
    }

    /// Storage key for a request path, appending the extension if missing
    pub fn key_for_path(&self, path: &str) -> String {
        if path.ends_with(&self.extension) {
            format!("{}{}", self.prefix, path)
        } else {
            format!("{}{}{}", self.prefix, path, self.extension)
        }
    }
}

impl From<&ContentConfig> for ContentLayout {
    fn from(config: &ContentConfig) -> Self {
        Self::new(config.prefix.clone(), config.extension.clone())
    }
}

impl Default for ContentLayout {
    fn default() -> Self {
        Self::from(&ContentConfig::default())
    }
}
