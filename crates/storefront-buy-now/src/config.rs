//! Buy-now endpoint configuration.

use serde::{Deserialize, Serialize};

/// Order server the endpoint forwards to.
pub const DEFAULT_UPSTREAM_URL: &str = "https://simpleswap-automation-1.onrender.com";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyNowConfig {
    /// Base URL of the order server; `/buy-now` is appended.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Upstream request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for BuyNowConfig {
    fn default() -> Self {
        Self {
            upstream_url: default_upstream_url(),
            timeout_secs: default_timeout(),
        }
    }
}

impl BuyNowConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `STOREFRONT_UPSTREAM_URL` | Order server base URL |
    /// | `STOREFRONT_UPSTREAM_TIMEOUT` | Request timeout in seconds |
    pub fn from_env() -> Self {
        Self {
            upstream_url: std::env::var("STOREFRONT_UPSTREAM_URL")
                .unwrap_or_else(|_| default_upstream_url()),
            timeout_secs: std::env::var("STOREFRONT_UPSTREAM_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
        }
    }

    pub fn with_upstream_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Full URL of the upstream order endpoint.
    pub fn buy_now_url(&self) -> String {
        format!("{}/buy-now", self.upstream_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_buy_now_url_trims_slash() {
        let config = BuyNowConfig::default().with_upstream_url("https://orders.example/");
        assert_eq!(config.buy_now_url(), "https://orders.example/buy-now");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("STOREFRONT_UPSTREAM_URL", "http://127.0.0.1:9000");
        std::env::set_var("STOREFRONT_UPSTREAM_TIMEOUT", "5");
        let config = BuyNowConfig::from_env();
        std::env::remove_var("STOREFRONT_UPSTREAM_URL");
        std::env::remove_var("STOREFRONT_UPSTREAM_TIMEOUT");

        assert_eq!(config.buy_now_url(), "http://127.0.0.1:9000/buy-now");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let config = BuyNowConfig::from_env();
        assert_eq!(
            config.buy_now_url(),
            "https://simpleswap-automation-1.onrender.com/buy-now"
        );
    }
}
