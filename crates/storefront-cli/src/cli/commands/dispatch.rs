use super::super::args::{Cli, Command};

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Install(args) => super::install::run(args).await,
        Command::Fetch(args) => super::fetch::run(args).await,
        Command::Namespaces(args) => super::namespaces::run(args).await,
        Command::Serve(args) => super::serve::run(args).await,
        Command::BuyNow(args) => super::buy_now::run(args).await,
    }
}
