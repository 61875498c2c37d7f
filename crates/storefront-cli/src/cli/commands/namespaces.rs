use storefront_cache::CacheStorage;

use super::super::args::StoreArgs;
use crate::exit_codes::SUCCESS;

pub async fn run(args: StoreArgs) -> anyhow::Result<i32> {
    let storage = super::open_store(&args)?;
    for namespace in storage.keys().await? {
        let entries = storage.entries(&namespace).await?;
        println!("{}\t{}", namespace, entries.len());
    }
    Ok(SUCCESS)
}
