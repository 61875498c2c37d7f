//! Filesystem helpers: default location and atomic writes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;

use crate::error::{CacheError, CacheResult};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

pub(crate) fn default_cache_dir_impl() -> CacheResult<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| CacheError::Storage {
            message: "could not determine cache directory".to_string(),
        })?;

    Ok(base.join("storefront").join("cache").join("assets"))
}

/// Write via a uniquely named temp file and rename, so concurrent refreshes of
/// the same key never observe a half-written file.
pub(crate) async fn write_atomic_impl(path: &Path, content: &[u8]) -> CacheResult<()> {
    let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let temp_path = path.with_extension(format!("{}-{}.tmp", std::process::id(), seq));

    fs::write(&temp_path, content)
        .await
        .map_err(|e| CacheError::storage("failed to write temp file", e))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(CacheError::storage("failed to rename temp file", e));
    }

    Ok(())
}
