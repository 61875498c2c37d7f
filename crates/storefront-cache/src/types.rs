//! Request, response and lifecycle types shared by the cache manager and its hosts.

use std::fmt;

use bytes::Bytes;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CacheError, CacheResult};

/// Versioned partition of stored responses (e.g., `storefront-v1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheNamespace {
    /// Asset set name.
    pub name: String,

    /// Deployment version tag.
    pub version: String,
}

impl CacheNamespace {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Storage identifier: `{name}-{version}`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}

impl fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// A request observed by the cache manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub method: Method,
    pub url: Url,
}

impl AssetRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url }
    }

    /// A `GET` for `url`.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse an absolute URL into a request.
    pub fn parse(method: Method, url: &str) -> CacheResult<Self> {
        let parsed = Url::parse(url).map_err(|e| CacheError::InvalidRequest {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(method, parsed))
    }

    /// Identifier used as the storage key. Fragments never reach the network,
    /// so they are not part of the key.
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        format!("{} {}", self.method, url)
    }

    /// Whether the request targets the same scheme/host/port as `origin`.
    pub fn is_same_origin(&self, origin: &Url) -> bool {
        self.url.origin() == origin.origin()
    }
}

/// How a response was obtained, mirroring the fetch response types that matter for caching.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response.
    #[default]
    Basic,
    /// Cross-origin response with readable body.
    Cors,
    /// Cross-origin response with hidden status and body.
    Opaque,
}

/// A complete response as stored in (or served from) a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub kind: ResponseKind,
    /// The network followed at least one redirect to produce this response.
    pub redirected: bool,
}

impl StoredResponse {
    /// A plain `basic` response with the given status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
            kind: ResponseKind::Basic,
            redirected: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only whole, readable, non-redirected successes may overwrite an entry.
    /// 206 is excluded because a partial body must never replace a full one.
    pub fn is_cacheable(&self) -> bool {
        self.is_success()
            && self.status != 206
            && self.kind != ResponseKind::Opaque
            && !self.redirected
    }
}

/// Lifecycle of one cache manager version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Waiting,
    Active,
    Superseded,
    /// Install failed, or a newer version replaced this one before it was promoted.
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Installing => "installing",
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Superseded => "superseded",
            Self::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Control instruction sent by the hosting page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Promote a waiting version without waiting for consumers to disconnect.
    SkipWaiting,
}

impl ControlMessage {
    /// Parse a page message such as `{"type":"SKIP_WAITING"}`.
    ///
    /// Anything else (malformed JSON, missing or unknown `type`) yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        match value.get("type").and_then(|t| t.as_str()) {
            Some("SKIP_WAITING") => Some(Self::SkipWaiting),
            _ => None,
        }
    }
}
