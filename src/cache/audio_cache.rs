use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

use super::key::CacheKey;
use super::store::{DurableStore, StoredEntry};

/// Summary of what the durable tier holds
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_files: usize,
    pub total_size: usize,
    pub total_size_mb: String,
    pub files: Vec<StoredEntry>,
}

/// Two-tier audio cache: an in-memory map shadowing a durable store.
///
/// Reads never fail (storage faults read as a miss) and writes are
/// best-effort. No eviction.
pub struct AudioCache {
    memory: RwLock<HashMap<CacheKey, Arc<Vec<u8>>>>,
    durable: Arc<dyn DurableStore>,
}

impl AudioCache {
    pub fn new(durable: Arc<dyn DurableStore>) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            durable,
        }
    }

    fn memory_get(&self, key: &CacheKey) -> Option<Arc<Vec<u8>>> {
        self.memory
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn memory_put(&self, key: CacheKey, value: Arc<Vec<u8>>) {
        self.memory
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key, value);
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<Vec<u8>>> {
        if let Some(hit) = self.memory_get(key) {
            debug!("Cache hit (memory): {}", key);
            return Some(hit);
        }

        match self.durable.get(key.as_str()).await {
            Ok(Some(bytes)) => {
                debug!("Cache hit (disk): {}", key);
                let value = Arc::new(bytes);
                self.memory_put(key.clone(), Arc::clone(&value));
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Cache read failed for {}: {:#}", key, e);
                None
            }
        }
    }

    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.get(key).await.is_some()
    }

    pub async fn put(&self, key: &CacheKey, value: Vec<u8>) {
        let value = Arc::new(value);
        self.memory_put(key.clone(), Arc::clone(&value));

        if let Err(e) = self.durable.put(key.as_str(), &value).await {
            warn!("Cache write failed for {}: {:#}", key, e);
        }
    }

    pub async fn remove(&self, key: &CacheKey) {
        self.memory
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);

        if let Err(e) = self.durable.delete(key.as_str()).await {
            warn!("Cache delete failed for {}: {:#}", key, e);
        }
    }

    /// Drop the in-memory tier only
    pub fn clear_memory(&self) {
        self.memory
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub async fn clear(&self) {
        self.clear_memory();
        if let Err(e) = self.durable.clear().await {
            warn!("Cache clear failed: {:#}", e);
        }
    }

    pub fn memory_len(&self) -> usize {
        self.memory
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub async fn stats(&self) -> CacheStats {
        let files = match self.durable.entries().await {
            Ok(files) => files,
            Err(e) => {
                warn!("Cache stats unavailable: {:#}", e);
                Vec::new()
            }
        };
        let total_size: usize = files.iter().map(|f| f.size).sum();

        CacheStats {
            total_files: files.len(),
            total_size,
            total_size_mb: format!("{:.2}", total_size as f64 / (1024.0 * 1024.0)),
            files,
        }
    }
}
