use std::sync::Arc;

use storefront_cache::{AssetCacheManager, AssetRequest, FetchOutcome, Fetcher, HttpFetcher};
use tracing::warn;
use url::Url;

use super::super::args::FetchArgs;
use crate::exit_codes::SUCCESS;

pub async fn run(args: FetchArgs) -> anyhow::Result<i32> {
    let config = super::cache_config(&args.cache)?;
    let storage = super::open_store(&args.cache.store)?;
    let fetcher = Arc::new(HttpFetcher::new(config.timeout_secs)?);

    let manager = AssetCacheManager::new(config, storage, fetcher.clone())?;
    manager.resume_active().await?;

    let url = resolve(manager.origin(), &args.path)?;
    let outcome = manager.on_fetch(AssetRequest::get(url)).await?;
    let source = outcome.source();

    let status = match outcome {
        FetchOutcome::Cached {
            response,
            revalidation,
        } => {
            // Let the background refresh land before the process exits.
            if let Err(e) = revalidation.settled().await {
                warn!(error = %e, "refresh failed; cached entry kept");
            }
            response.status
        }
        FetchOutcome::Network(response) => response.status,
        FetchOutcome::Passthrough(request) => fetcher.fetch(&request).await?.status,
    };

    println!("{} {}", source, status);
    Ok(SUCCESS)
}

/// Relative paths resolve against the cached origin; absolute URLs pass as-is.
fn resolve(origin: &Url, path: &str) -> anyhow::Result<Url> {
    match Url::parse(path) {
        Ok(url) => Ok(url),
        Err(_) => Ok(origin.join(path)?),
    }
}
