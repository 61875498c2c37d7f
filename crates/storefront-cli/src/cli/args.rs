use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "storefront",
    version,
    about = "Offline asset cache and buy-now endpoint for the storefront landing page"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Install and activate a cache version from the origin
    Install(InstallArgs),
    /// Run one intercepted fetch against the active cache
    Fetch(FetchArgs),
    /// List cache namespaces in the store
    Namespaces(StoreArgs),
    /// Serve the buy-now endpoint over HTTP
    Serve(ServeArgs),
    /// Invoke the buy-now handler once
    BuyNow(BuyNowArgs),
}

/// Where the disk store lives.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Cache directory (default: platform cache dir)
    #[arg(long, env = "STOREFRONT_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Cache settings; unset flags fall back to the manifest, then the environment.
#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// YAML manifest with the cache settings
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Origin whose requests are cached
    #[arg(long)]
    pub origin: Option<String>,

    /// Namespace version tag
    #[arg(long = "cache-version")]
    pub cache_version: Option<String>,

    /// Network timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Path (or absolute URL) to request
    pub path: String,
}

#[derive(Args, Debug, Clone)]
pub struct UpstreamArgs {
    /// Order server base URL
    #[arg(long, env = "STOREFRONT_UPSTREAM_URL")]
    pub upstream: Option<String>,

    /// Upstream timeout in seconds
    #[arg(long, env = "STOREFRONT_UPSTREAM_TIMEOUT")]
    pub upstream_timeout: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub upstream: UpstreamArgs,

    /// Address to listen on
    #[arg(long, env = "STOREFRONT_BIND", default_value = "127.0.0.1:8888")]
    pub bind: SocketAddr,
}

#[derive(Args, Debug, Clone)]
pub struct BuyNowArgs {
    #[command(flatten)]
    pub upstream: UpstreamArgs,

    /// Order amount in USD, forwarded as given
    #[arg(long)]
    pub amount: serde_json::Number,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "storefront",
            "fetch",
            "--origin",
            "http://127.0.0.1:9000",
            "--cache-dir",
            "/tmp/store",
            "/index.html",
        ])
        .unwrap();
        match cli.cmd {
            Command::Fetch(args) => {
                assert_eq!(args.path, "/index.html");
                assert_eq!(args.cache.origin.as_deref(), Some("http://127.0.0.1:9000"));
                assert_eq!(args.cache.store.cache_dir, Some(PathBuf::from("/tmp/store")));
            }
            _ => panic!("expected fetch"),
        }
    }

    #[test]
    fn test_buy_now_requires_amount() {
        assert!(Cli::try_parse_from(["storefront", "buy-now"]).is_err());
        let cli = Cli::try_parse_from(["storefront", "buy-now", "--amount", "59"]).unwrap();
        assert!(matches!(cli.cmd, Command::BuyNow(ref a) if a.amount.as_u64() == Some(59)));
    }

    #[test]
    fn test_serve_bind_default() {
        let cli = Cli::try_parse_from(["storefront", "serve"]).unwrap();
        match cli.cmd {
            Command::Serve(args) => assert_eq!(args.bind.port(), 8888),
            _ => panic!("expected serve"),
        }
    }
}
