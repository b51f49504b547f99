//! Object storage - the key/value blob store posts are read from
//!
//! The blog only needs two primitives: listing keys under a prefix and
//! fetching a single object. Any store with prefix listing can back it.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by an object store
#[derive(Error, Debug)]
pub enum StorageError {
    /// The key cannot be mapped onto the store (empty, absolute, `..`)
    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Read-only access to a key/value blob store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List every key starting with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Fetch an object, `None` if the key does not exist
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
}
