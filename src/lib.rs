//! webblog: a small blog server backed by an object store
//!
//! Posts are Markdown files with a `---` fenced front-matter block. On
//! every request the server lists them, orders them by creation date and
//! renders either the listing homepage or a single post with links to its
//! chronological neighbours.

pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod server;
pub mod storage;
pub mod templates;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default configuration file name, looked up in the base directory
pub const CONFIG_FILE: &str = "webblog.yml";

/// The blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Root directory of the object store
    pub storage_dir: PathBuf,
}

impl Blog {
    /// Create a new blog from a directory
    ///
    /// An explicit `config_path` must exist; otherwise `webblog.yml` in
    /// the base directory is used when present, and defaults when not.
    pub fn new<P: AsRef<Path>>(base_dir: P, config_path: Option<&Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();

        let config = match config_path {
            Some(path) => config::SiteConfig::load(path)
                .with_context(|| format!("failed to load configuration from {:?}", path))?,
            None => {
                let default_path = base_dir.join(CONFIG_FILE);
                if default_path.exists() {
                    config::SiteConfig::load(&default_path).with_context(|| {
                        format!("failed to load configuration from {:?}", default_path)
                    })?
                } else {
                    tracing::debug!("No {} in {:?}, using defaults", CONFIG_FILE, base_dir);
                    config::SiteConfig::default()
                }
            }
        };

        let storage_dir = base_dir.join(&config.storage.root);

        Ok(Self {
            config,
            storage_dir,
        })
    }

    /// Object store holding the posts
    pub fn store(&self) -> Arc<dyn storage::ObjectStore> {
        Arc::new(storage::FsStore::new(&self.storage_dir))
    }

    /// Page generator over this blog's store
    pub fn generator(&self) -> Result<generator::Generator> {
        generator::Generator::new(self.config.clone(), self.store())
    }
}
