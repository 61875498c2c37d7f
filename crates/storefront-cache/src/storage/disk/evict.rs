//! Namespace removal.

use tokio::fs;
use tracing::debug;

use crate::error::{CacheError, CacheResult};

use super::read::path_exists;
use super::DiskCacheStorage;

pub(crate) async fn delete_impl(storage: &DiskCacheStorage, namespace: &str) -> CacheResult<bool> {
    let ns_dir = storage.namespace_dir(namespace)?;

    if !path_exists(&ns_dir).await {
        return Ok(false);
    }

    fs::remove_dir_all(&ns_dir)
        .await
        .map_err(|e| CacheError::storage("failed to delete namespace", e))?;
    debug!(namespace, "deleted namespace from disk");
    Ok(true)
}
