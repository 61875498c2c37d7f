//! Namespaced response storage.
//!
//! A storage holds any number of namespaces; each namespace maps a request
//! identifier ([`AssetRequest::cache_key`]) to one [`StoredResponse`]. Writes
//! replace an entry wholesale.

use async_trait::async_trait;

use crate::error::CacheResult;
use crate::types::{AssetRequest, StoredResponse};

mod disk;
mod memory;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

/// Backend for cache namespaces.
///
/// Every method is a single key-level (or namespace-level) operation; there
/// are no cross-key transactions apart from [`CacheStorage::put_all`].
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the namespace if it does not exist.
    async fn open(&self, namespace: &str) -> CacheResult<()>;

    /// Whether the namespace exists.
    async fn has(&self, namespace: &str) -> CacheResult<bool>;

    /// All namespace identifiers, sorted.
    async fn keys(&self) -> CacheResult<Vec<String>>;

    /// Remove a namespace and every entry in it. Returns `false` if it did not exist.
    async fn delete(&self, namespace: &str) -> CacheResult<bool>;

    /// Look up the stored response for a request.
    async fn match_request(
        &self,
        namespace: &str,
        request: &AssetRequest,
    ) -> CacheResult<Option<StoredResponse>>;

    /// Store (or replace) the response for a request, creating the namespace if needed.
    async fn put(
        &self,
        namespace: &str,
        request: &AssetRequest,
        response: &StoredResponse,
    ) -> CacheResult<()>;

    /// Store a batch of responses.
    async fn put_all(
        &self,
        namespace: &str,
        entries: &[(AssetRequest, StoredResponse)],
    ) -> CacheResult<()> {
        for (request, response) in entries {
            self.put(namespace, request, response).await?;
        }
        Ok(())
    }

    /// Cache keys stored in a namespace, sorted. Empty if the namespace does not exist.
    async fn entries(&self, namespace: &str) -> CacheResult<Vec<String>>;
}
