//! Disk write path.

use chrono::Utc;
use tokio::fs;
use tracing::debug;

use crate::error::{CacheError, CacheResult};
use crate::types::{AssetRequest, StoredResponse};

use super::keys;
use super::{io, DiskCacheStorage, EntryMeta};

/// Metadata and body go into one file replaced by a single rename, so
/// overlapping writers of a key leave exactly one of them on disk.
pub(crate) async fn put_impl(
    storage: &DiskCacheStorage,
    namespace: &str,
    request: &AssetRequest,
    response: &StoredResponse,
) -> CacheResult<()> {
    let cache_key = request.cache_key();
    let ns_dir = storage.namespace_dir(namespace)?;
    let entry_path = keys::entry_path_impl(&ns_dir, &cache_key);

    fs::create_dir_all(&ns_dir)
        .await
        .map_err(|e| CacheError::storage("failed to create namespace directory", e))?;

    let metadata = EntryMeta {
        key: cache_key,
        status: response.status,
        headers: response.headers.clone(),
        kind: response.kind,
        redirected: response.redirected,
        fetched_at: Utc::now(),
        digest: keys::sha256_hex(&response.body),
        size: response.body.len() as u64,
    };

    let encoded = metadata.encode(&response.body)?;
    io::write_atomic_impl(&entry_path, &encoded).await?;

    debug!(namespace, key = %metadata.key, size = metadata.size, "stored entry");
    Ok(())
}
