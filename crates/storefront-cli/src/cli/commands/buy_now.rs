use serde_json::json;
use storefront_buy_now::{BuyNowEvent, BuyNowProxy};

use super::super::args::BuyNowArgs;
use crate::exit_codes::{COMMAND_FAILED, SUCCESS};

pub async fn run(args: BuyNowArgs) -> anyhow::Result<i32> {
    let proxy = BuyNowProxy::new(&super::buy_now_config(&args.upstream))?;
    let body = json!({ "amountUSD": args.amount }).to_string();

    let response = proxy.handle(BuyNowEvent::post(body)).await;
    println!("{}", response.status);
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    Ok(if response.status == 200 {
        SUCCESS
    } else {
        COMMAND_FAILED
    })
}
