pub mod buy_now;
pub mod dispatch;
pub mod fetch;
pub mod install;
pub mod namespaces;
pub mod serve;

pub use dispatch::dispatch;

use std::sync::Arc;

use storefront_buy_now::BuyNowConfig;
use storefront_cache::{CacheConfig, DiskCacheStorage};

use super::args::{CacheArgs, StoreArgs, UpstreamArgs};

/// Manifest (if given) or environment, then explicit flags on top.
pub(crate) fn cache_config(args: &CacheArgs) -> anyhow::Result<CacheConfig> {
    let mut config = match &args.config {
        Some(path) => CacheConfig::from_yaml_file(path)?,
        None => CacheConfig::from_env(),
    };
    if let Some(origin) = &args.origin {
        config = config.with_origin(origin.clone());
    }
    if let Some(version) = &args.cache_version {
        config = config.with_version(version.clone());
    }
    if let Some(timeout) = args.timeout {
        config = config.with_timeout_secs(timeout);
    }
    Ok(config)
}

pub(crate) fn open_store(args: &StoreArgs) -> anyhow::Result<Arc<DiskCacheStorage>> {
    let storage = match &args.cache_dir {
        Some(dir) => DiskCacheStorage::with_dir(dir.clone()),
        None => DiskCacheStorage::new()?,
    };
    Ok(Arc::new(storage))
}

pub(crate) fn buy_now_config(args: &UpstreamArgs) -> BuyNowConfig {
    let mut config = BuyNowConfig::default();
    if let Some(url) = &args.upstream {
        config = config.with_upstream_url(url.clone());
    }
    if let Some(timeout) = args.upstream_timeout {
        config = config.with_timeout_secs(timeout);
    }
    config
}
