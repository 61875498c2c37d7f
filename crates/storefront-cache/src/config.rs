//! Cache manager configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CacheError, CacheResult};
use crate::types::CacheNamespace;

/// Critical assets shipped with the landing page.
pub const DEFAULT_CRITICAL_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/images/product/product-01-800.avif",
    "/images/product/product-01-800.webp",
    "/fonts/cormorant-garamond-700.woff2",
    "/fonts/montserrat-600.woff2",
    "/fonts/montserrat-400.woff2",
];

/// Configuration for one version of the cache manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Origin whose requests are intercepted; critical assets resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Asset set name (namespace prefix).
    #[serde(default = "default_name")]
    pub name: String,

    /// Version tag of this deployment.
    #[serde(default = "default_version")]
    pub version: String,

    /// Paths that must be stored before install completes.
    #[serde(default = "default_critical_assets")]
    pub critical_assets: Vec<String>,

    /// Network timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Request promotion as soon as install succeeds.
    #[serde(default)]
    pub skip_waiting: bool,

    /// Take over consumers of the previous version on activation.
    #[serde(default = "default_claim_clients")]
    pub claim_clients: bool,
}

fn default_origin() -> String {
    "http://localhost:8888".to_string()
}

fn default_name() -> String {
    "storefront".to_string()
}

fn default_version() -> String {
    "v1".to_string()
}

fn default_critical_assets() -> Vec<String> {
    DEFAULT_CRITICAL_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_timeout() -> u64 {
    30
}

fn default_claim_clients() -> bool {
    true
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            name: default_name(),
            version: default_version(),
            critical_assets: default_critical_assets(),
            timeout_secs: default_timeout(),
            skip_waiting: false,
            claim_clients: default_claim_clients(),
        }
    }
}

impl CacheConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `STOREFRONT_ORIGIN` | Intercepted origin |
    /// | `STOREFRONT_CACHE_NAME` | Namespace name |
    /// | `STOREFRONT_CACHE_VERSION` | Namespace version tag |
    /// | `STOREFRONT_CRITICAL_ASSETS` | Comma-separated asset paths |
    /// | `STOREFRONT_FETCH_TIMEOUT` | Network timeout in seconds |
    /// | `STOREFRONT_SKIP_WAITING` | Promote immediately after install |
    /// | `STOREFRONT_CLAIM_CLIENTS` | Claim open consumers on activation |
    pub fn from_env() -> Self {
        Self {
            origin: std::env::var("STOREFRONT_ORIGIN").unwrap_or_else(|_| default_origin()),
            name: std::env::var("STOREFRONT_CACHE_NAME").unwrap_or_else(|_| default_name()),
            version: std::env::var("STOREFRONT_CACHE_VERSION")
                .unwrap_or_else(|_| default_version()),
            critical_assets: std::env::var("STOREFRONT_CRITICAL_ASSETS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_else(|_| default_critical_assets()),
            timeout_secs: std::env::var("STOREFRONT_FETCH_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            skip_waiting: env_flag("STOREFRONT_SKIP_WAITING", false),
            claim_clients: env_flag("STOREFRONT_CLAIM_CLIENTS", default_claim_clients()),
        }
    }

    /// Load a deployment manifest (YAML). Missing fields take their defaults.
    pub fn from_yaml_file(path: &Path) -> CacheResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| CacheError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> CacheResult<Self> {
        let config: Self = serde_yaml::from_str(raw).map_err(|e| CacheError::Config {
            message: format!("invalid cache manifest: {}", e),
        })?;
        config.origin_url()?;
        Ok(config)
    }

    pub fn namespace(&self) -> CacheNamespace {
        CacheNamespace::new(&self.name, &self.version)
    }

    pub fn origin_url(&self) -> CacheResult<Url> {
        Url::parse(&self.origin).map_err(|e| CacheError::Config {
            message: format!("invalid origin {}: {}", self.origin, e),
        })
    }

    /// Resolve every critical asset path against the origin, preserving order.
    ///
    /// Assets must live on the origin: a cross-origin entry could be stored
    /// but never served.
    pub fn critical_asset_urls(&self) -> CacheResult<Vec<Url>> {
        let origin = self.origin_url()?;
        self.critical_assets
            .iter()
            .map(|asset| {
                let url = origin.join(asset).map_err(|e| CacheError::Config {
                    message: format!("invalid critical asset {}: {}", asset, e),
                })?;
                if url.origin() != origin.origin() {
                    return Err(CacheError::Config {
                        message: format!(
                            "critical asset {} is not on origin {}",
                            asset,
                            origin.origin().ascii_serialization()
                        ),
                    });
                }
                Ok(url)
            })
            .collect()
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_critical_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.critical_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skip_waiting(mut self, skip: bool) -> Self {
        self.skip_waiting = skip;
        self
    }

    pub fn with_claim_clients(mut self, claim: bool) -> Self {
        self.claim_clients = claim;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}
