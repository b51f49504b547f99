//! In-process object store

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{ObjectStore, StorageError};

/// Object store kept in memory, keyed in lexical order
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert(key.into(), data.into());
        }
    }

    /// Remove an object, returning whether it existed
    pub fn remove(&self, key: &str) -> bool {
        self.objects
            .write()
            .map(|mut objects| objects.remove(key).is_some())
            .unwrap_or(false)
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryStore
where
    K: Into<String>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let objects = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            objects: RwLock::new(objects),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))?;

        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_string()))?;

        Ok(objects.get(key).cloned())
    }
}
