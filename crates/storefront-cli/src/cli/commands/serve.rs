use storefront_buy_now::BuyNowProxy;

use super::super::args::ServeArgs;
use crate::exit_codes::SUCCESS;

pub async fn run(args: ServeArgs) -> anyhow::Result<i32> {
    let proxy = BuyNowProxy::new(&super::buy_now_config(&args.upstream))?;
    storefront_buy_now::serve(proxy, args.bind).await?;
    Ok(SUCCESS)
}
