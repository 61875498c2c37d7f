//! Offline asset cache for the storefront landing page.
//!
//! This crate implements a stale-while-revalidate cache in the shape of a
//! service worker, as an explicit interface a host can drive:
//!
//! - Versioned cache namespaces (`{name}-{version}`), populated all-or-nothing
//!   with the critical assets on install
//! - Activation that reclaims every namespace but the current one
//! - Interception of same-origin `GET`s: cached responses are returned
//!   immediately while the network refreshes the entry in the background
//! - A [`Registration`] host that tracks active/waiting versions and honors
//!   the page's `SKIP_WAITING` message
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use storefront_cache::{
//!     AssetRequest, CacheConfig, DiskCacheStorage, HttpFetcher, Registration,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::from_env();
//! let registration = Registration::new(
//!     Arc::new(DiskCacheStorage::new()?),
//!     Arc::new(HttpFetcher::new(config.timeout_secs)?),
//! );
//!
//! let manager = registration.register(config).await?;
//! let page = registration.connect().await;
//!
//! let url = manager.origin().join("/index.html")?;
//! let outcome = registration.fetch(page, AssetRequest::get(url)).await?;
//! println!("served from {}", outcome.source());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `STOREFRONT_ORIGIN` | Origin whose requests are intercepted (default: `http://localhost:8888`) |
//! | `STOREFRONT_CACHE_NAME` | Namespace name (default: `storefront`) |
//! | `STOREFRONT_CACHE_VERSION` | Namespace version tag (default: `v1`) |
//! | `STOREFRONT_CRITICAL_ASSETS` | Comma-separated critical asset paths |
//! | `STOREFRONT_FETCH_TIMEOUT` | Network timeout in seconds (default: 30) |
//! | `STOREFRONT_SKIP_WAITING` | Promote right after install |
//! | `STOREFRONT_CLAIM_CLIENTS` | Take over open consumers on activation (default: true) |

pub mod config;
pub mod error;
pub mod fetch;
pub mod manager;
pub mod registration;
pub mod storage;
pub mod types;

pub use config::{CacheConfig, DEFAULT_CRITICAL_ASSETS};
pub use error::{CacheError, CacheResult};
pub use fetch::{Fetcher, HttpFetcher, FETCH_USER_AGENT};
pub use manager::{AssetCacheManager, FetchOutcome, InstallReport, ResponseSource, Revalidation};
pub use registration::{ClientId, Registration};
pub use storage::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};
pub use types::{
    AssetRequest, CacheNamespace, ControlMessage, LifecycleState, ResponseKind, StoredResponse,
};
