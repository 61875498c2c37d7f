//! Disk read path, with integrity verification on every read.

use std::io::ErrorKind;

use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{CacheError, CacheResult};
use crate::types::{AssetRequest, StoredResponse};

use super::keys;
use super::{DiskCacheStorage, EntryMeta};

pub(crate) async fn match_impl(
    storage: &DiskCacheStorage,
    namespace: &str,
    request: &AssetRequest,
) -> CacheResult<Option<StoredResponse>> {
    let cache_key = request.cache_key();
    let entry_path = keys::entry_path_impl(&storage.namespace_dir(namespace)?, &cache_key);

    let raw = match fs::read(&entry_path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(namespace, key = %cache_key, "entry not on disk");
            return Ok(None);
        }
        Err(e) => return Err(CacheError::storage("failed to read entry", e)),
    };

    let (metadata, body) = EntryMeta::decode(&raw)?;

    let computed = keys::sha256_hex(body);
    if computed != metadata.digest {
        warn!(
            namespace,
            key = %cache_key,
            expected = %metadata.digest,
            actual = %computed,
            "entry integrity check failed"
        );
        return Err(CacheError::DigestMismatch {
            key: cache_key,
            expected: metadata.digest,
            actual: computed,
        });
    }

    Ok(Some(StoredResponse {
        status: metadata.status,
        headers: metadata.headers,
        body: Bytes::copy_from_slice(body),
        kind: metadata.kind,
        redirected: metadata.redirected,
    }))
}

pub(crate) async fn entries_impl(
    storage: &DiskCacheStorage,
    namespace: &str,
) -> CacheResult<Vec<String>> {
    let ns_dir = storage.namespace_dir(namespace)?;
    let mut result = Vec::new();

    if !path_exists(&ns_dir).await {
        return Ok(result);
    }

    let mut dirs = fs::read_dir(&ns_dir)
        .await
        .map_err(|e| CacheError::storage("failed to read namespace directory", e))?;

    while let Some(entry) = dirs
        .next_entry()
        .await
        .map_err(|e| CacheError::storage("failed to read directory entry", e))?
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(keys::ENTRY_EXT) {
            continue;
        }
        let Ok(raw) = fs::read(&path).await else {
            continue;
        };
        if let Ok((meta, _)) = EntryMeta::decode(&raw) {
            result.push(meta.key);
        }
    }

    result.sort();
    Ok(result)
}

pub(crate) async fn keys_impl(storage: &DiskCacheStorage) -> CacheResult<Vec<String>> {
    let mut result = Vec::new();

    if !path_exists(&storage.root).await {
        return Ok(result);
    }

    let mut dirs = fs::read_dir(&storage.root)
        .await
        .map_err(|e| CacheError::storage("failed to read cache directory", e))?;

    while let Some(entry) = dirs
        .next_entry()
        .await
        .map_err(|e| CacheError::storage("failed to read directory entry", e))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map(|t| t.is_dir())
            .unwrap_or(false);
        let name = entry.file_name().to_string_lossy().to_string();
        if is_dir && !name.starts_with('.') {
            result.push(name);
        }
    }

    result.sort();
    Ok(result)
}

pub(crate) async fn path_exists(path: &std::path::Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}
