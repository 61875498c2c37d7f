use std::sync::Arc;

use storefront_cache::{CacheStorage, HttpFetcher, Registration};
use tracing::info;

use super::super::args::InstallArgs;
use crate::exit_codes::SUCCESS;

/// Install the configured version and activate it. No pages are connected,
/// so promotion happens right away and older namespaces are reclaimed.
pub async fn run(args: InstallArgs) -> anyhow::Result<i32> {
    let config = super::cache_config(&args.cache)?;
    let storage = super::open_store(&args.cache.store)?;
    let fetcher = Arc::new(HttpFetcher::new(config.timeout_secs)?);

    let registration = Registration::new(storage.clone(), fetcher);
    let manager = registration.register(config).await?;
    info!(namespace = manager.namespace_id(), root = %storage.root().display(), "install complete");

    println!("{}", manager.namespace_id());
    for key in storage.entries(manager.namespace_id()).await? {
        println!("  {}", key);
    }
    Ok(SUCCESS)
}
