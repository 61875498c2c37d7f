//! In-memory storage for tests and embedded hosts.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CacheResult;
use crate::types::{AssetRequest, StoredResponse};

use super::CacheStorage;

type Namespaces = BTreeMap<String, HashMap<String, StoredResponse>>;

/// In-memory storage keyed by `(namespace, cache_key)`. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCacheStorage {
    inner: Arc<RwLock<Namespaces>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, namespace: &str) -> CacheResult<()> {
        self.inner
            .write()
            .await
            .entry(namespace.to_string())
            .or_default();
        Ok(())
    }

    async fn has(&self, namespace: &str) -> CacheResult<bool> {
        Ok(self.inner.read().await.contains_key(namespace))
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.inner.read().await.keys().cloned().collect())
    }

    async fn delete(&self, namespace: &str) -> CacheResult<bool> {
        Ok(self.inner.write().await.remove(namespace).is_some())
    }

    async fn match_request(
        &self,
        namespace: &str,
        request: &AssetRequest,
    ) -> CacheResult<Option<StoredResponse>> {
        Ok(self
            .inner
            .read()
            .await
            .get(namespace)
            .and_then(|entries| entries.get(&request.cache_key()))
            .cloned())
    }

    async fn put(
        &self,
        namespace: &str,
        request: &AssetRequest,
        response: &StoredResponse,
    ) -> CacheResult<()> {
        self.inner
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .insert(request.cache_key(), response.clone());
        Ok(())
    }

    async fn put_all(
        &self,
        namespace: &str,
        entries: &[(AssetRequest, StoredResponse)],
    ) -> CacheResult<()> {
        let mut guard = self.inner.write().await;
        let ns = guard.entry(namespace.to_string()).or_default();
        for (request, response) in entries {
            ns.insert(request.cache_key(), response.clone());
        }
        Ok(())
    }

    async fn entries(&self, namespace: &str) -> CacheResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .inner
            .read()
            .await
            .get(namespace)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}
