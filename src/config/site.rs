//! Site configuration (webblog.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub listing_heading: String,
    pub language: String,

    /// Answer 404 instead of 200 when a post is missing
    pub strict_not_found: bool,

    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Blog".to_string(),
            listing_heading: "Blog Posts".to_string(),
            language: "en".to_string(),
            strict_not_found: false,
            storage: StorageConfig::default(),
            content: ContentConfig::default(),
            fetch: FetchConfig::default(),
            highlight: HighlightConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

/// Where objects are read from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory of the store, relative to the base directory
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "content".to_string(),
        }
    }
}

/// Layout of post objects inside the store
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub prefix: String,
    pub extension: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            prefix: "webblog/".to_string(),
            extension: ".md".to_string(),
        }
    }
}

/// Limits applied while fetching the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-object fetch timeout
    pub timeout_ms: u64,
    /// Concurrent fetches while building the catalog, 0 for no limit
    pub max_concurrent: usize,
    /// Deadline for building the whole catalog
    pub catalog_deadline_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_concurrent: 0,
            catalog_deadline_ms: 30_000,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn catalog_deadline(&self) -> Duration {
        Duration::from_millis(self.catalog_deadline_ms)
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    /// syntect theme name
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "InspiredGitHub".to_string(),
            line_number: false,
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ip: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ip: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}
