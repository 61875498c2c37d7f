//! Network side of the cache: fetching responses from the origin.
//!
//! Status codes are never errors here. A 404 is a response like any other;
//! only transport failures map to [`CacheError::Network`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::error::{CacheError, CacheResult};
use crate::types::{AssetRequest, ResponseKind, StoredResponse};

/// User agent sent with every origin request.
pub const FETCH_USER_AGENT: &str = concat!("storefront-cache/", env!("CARGO_PKG_VERSION"));

/// Issues real network requests on behalf of the cache manager.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &AssetRequest) -> CacheResult<StoredResponse>;
}

/// reqwest-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> CacheResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(FETCH_USER_AGENT));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| CacheError::Config {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &AssetRequest) -> CacheResult<StoredResponse> {
        let network_error = |e: reqwest::Error| CacheError::Network {
            url: request.url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status().as_u16();
        let redirected = response.url() != &request.url;
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(network_error)?;

        debug!(url = %request.url, status, redirected, size = body.len(), "fetched from network");

        Ok(StoredResponse {
            status,
            headers,
            body,
            kind: ResponseKind::Basic,
            redirected,
        })
    }
}
