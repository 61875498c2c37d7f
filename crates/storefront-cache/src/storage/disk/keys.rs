//! Namespace and entry path derivation.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::{CacheError, CacheResult};

/// Extension of entry files; anything else in a namespace dir is ignored.
pub(crate) const ENTRY_EXT: &str = "entry";

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize().as_slice()))
}

/// Namespace identifiers become directory names, so they must be a single
/// plain path component.
pub(crate) fn namespace_dir_impl(root: &Path, namespace: &str) -> CacheResult<PathBuf> {
    let valid = !namespace.is_empty()
        && namespace != "."
        && namespace != ".."
        && !namespace.starts_with('.')
        && !namespace.contains(['/', '\\', '\0']);
    if !valid {
        return Err(CacheError::Config {
            message: format!("invalid namespace identifier: {:?}", namespace),
        });
    }
    Ok(root.join(namespace))
}

pub(crate) fn entry_path_impl(namespace_dir: &Path, cache_key: &str) -> PathBuf {
    let digest = sha256_hex(cache_key.as_bytes());
    let hex = digest.trim_start_matches("sha256:");
    namespace_dir.join(format!("{}.{}", hex, ENTRY_EXT))
}
