use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::model::TradeModel;

/// In-memory cache of loaded trade models, keyed by artifact path.
///
/// Entries are evicted after TTL so a retrained artifact is picked up even
/// without an explicit invalidation.
pub struct ModelCache {
    inner: Cache<PathBuf, Arc<TradeModel>>,
}

impl ModelCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, path: &Path) -> Option<Arc<TradeModel>> {
        self.inner.get(path).await
    }

    pub async fn insert(&self, path: PathBuf, model: Arc<TradeModel>) {
        self.inner.insert(path, model).await;
    }

    pub async fn invalidate(&self, path: &Path) {
        self.inner.invalidate(path).await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
