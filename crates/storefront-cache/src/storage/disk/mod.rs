//! Disk-backed namespace storage.
//!
//! # Layout
//!
//! ```text
//! {root}/{namespace}/{sha256(cache_key)}.entry
//! ```
//!
//! An entry file is one line of JSON metadata (status, headers, kind, body
//! digest) followed by the raw body. Each file is replaced with a single
//! rename and the body digest is checked on every read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{CacheError, CacheResult};
use crate::types::{AssetRequest, ResponseKind, StoredResponse};

use super::CacheStorage;

mod evict;
mod io;
mod keys;
mod put;
mod read;

/// Metadata stored next to each body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct EntryMeta {
    /// Request identifier this entry answers.
    pub key: String,
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub kind: ResponseKind,
    #[serde(default)]
    pub redirected: bool,
    pub fetched_at: DateTime<Utc>,
    /// Digest of the body (sha256:...).
    pub digest: String,
    pub size: u64,
}

impl EntryMeta {
    /// Header line, newline, body. Compact JSON never contains a raw newline.
    pub(crate) fn encode(&self, body: &[u8]) -> CacheResult<Vec<u8>> {
        let mut out = serde_json::to_vec(self)
            .map_err(|e| CacheError::storage("failed to serialize metadata", e))?;
        out.reserve(body.len() + 1);
        out.push(b'\n');
        out.extend_from_slice(body);
        Ok(out)
    }

    pub(crate) fn decode(raw: &[u8]) -> CacheResult<(Self, &[u8])> {
        let split = raw
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| CacheError::Storage {
                message: "entry has no metadata header".to_string(),
            })?;
        let meta = serde_json::from_slice(&raw[..split])
            .map_err(|e| CacheError::storage("failed to parse entry metadata", e))?;
        Ok((meta, &raw[split + 1..]))
    }
}

/// Namespace storage rooted at a directory.
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    /// Storage at the default location.
    ///
    /// Default: `{user cache dir}/storefront/cache/assets`
    pub fn new() -> CacheResult<Self> {
        Ok(Self {
            root: io::default_cache_dir_impl()?,
        })
    }

    pub fn with_dir(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace: &str) -> CacheResult<PathBuf> {
        keys::namespace_dir_impl(&self.root, namespace)
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, namespace: &str) -> CacheResult<()> {
        fs::create_dir_all(self.namespace_dir(namespace)?)
            .await
            .map_err(|e| CacheError::storage("failed to create namespace", e))
    }

    async fn has(&self, namespace: &str) -> CacheResult<bool> {
        Ok(read::path_exists(&self.namespace_dir(namespace)?).await)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        read::keys_impl(self).await
    }

    async fn delete(&self, namespace: &str) -> CacheResult<bool> {
        evict::delete_impl(self, namespace).await
    }

    async fn match_request(
        &self,
        namespace: &str,
        request: &AssetRequest,
    ) -> CacheResult<Option<StoredResponse>> {
        read::match_impl(self, namespace, request).await
    }

    async fn put(
        &self,
        namespace: &str,
        request: &AssetRequest,
        response: &StoredResponse,
    ) -> CacheResult<()> {
        put::put_impl(self, namespace, request, response).await
    }

    async fn entries(&self, namespace: &str) -> CacheResult<Vec<String>> {
        read::entries_impl(self, namespace).await
    }
}
