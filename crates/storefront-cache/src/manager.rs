//! Stale-while-revalidate cache manager for one deployment version.
//!
//! The manager is driven by a host through four entry points:
//!
//! - [`AssetCacheManager::on_install`]: populate this version's namespace with
//!   every critical asset, all or nothing
//! - [`AssetCacheManager::on_activate`]: become current and delete every other namespace
//! - [`AssetCacheManager::on_fetch`]: serve same-origin `GET`s from cache while
//!   refreshing them from the network
//! - [`AssetCacheManager::on_message`]: accept a `SKIP_WAITING` promotion request
//!
//! Writes from background refreshes happen under the lifecycle read lock and
//! only while the manager is `Active`. Superseding a manager takes the write
//! lock, so once a successor starts cleaning up, no refresh can recreate a
//! stale namespace.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use reqwest::Method;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::fetch::Fetcher;
use crate::storage::CacheStorage;
use crate::types::{AssetRequest, CacheNamespace, ControlMessage, LifecycleState, StoredResponse};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Namespace identifier that was populated.
    pub namespace: String,

    /// Number of critical assets stored.
    pub assets: usize,
}

/// Where an intercepted request was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Not intercepted; the host performs the request itself.
    Passthrough,
    /// Served from the current namespace.
    Cache,
    /// Cold miss served from the network.
    Network,
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passthrough => write!(f, "passthrough"),
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Background network refresh started by [`AssetCacheManager::on_fetch`].
///
/// Dropping the handle does not cancel the refresh; the cache is still updated.
#[derive(Debug)]
pub struct Revalidation {
    url: String,
    handle: JoinHandle<CacheResult<StoredResponse>>,
}

impl Revalidation {
    /// Wait for the refresh (including its cache write) to settle.
    pub async fn settled(self) -> CacheResult<StoredResponse> {
        self.handle.await.map_err(|e| CacheError::Network {
            url: self.url,
            message: format!("refresh task failed: {}", e),
        })?
    }
}

/// Outcome of an intercepted fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Cross-origin, non-GET, or not controlled: the host must fetch it unmodified.
    Passthrough(AssetRequest),

    /// Served from cache; a refresh is running in the background.
    Cached {
        response: StoredResponse,
        revalidation: Revalidation,
    },

    /// Nothing cached; this is the network response (any status).
    Network(StoredResponse),
}

impl FetchOutcome {
    pub fn source(&self) -> ResponseSource {
        match self {
            Self::Passthrough(_) => ResponseSource::Passthrough,
            Self::Cached { .. } => ResponseSource::Cache,
            Self::Network(_) => ResponseSource::Network,
        }
    }

    /// The response handed to the consumer, if the request was intercepted.
    pub fn response(&self) -> Option<&StoredResponse> {
        match self {
            Self::Passthrough(_) => None,
            Self::Cached { response, .. } => Some(response),
            Self::Network(response) => Some(response),
        }
    }
}

struct Shared {
    config: CacheConfig,
    namespace: CacheNamespace,
    namespace_id: String,
    origin: Url,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    state: RwLock<LifecycleState>,
    promotion_requested: AtomicBool,
}

impl Shared {
    async fn store_if_active(&self, request: &AssetRequest, response: &StoredResponse) {
        let state = self.state.read().await;
        if *state != LifecycleState::Active {
            debug!(
                namespace = %self.namespace_id,
                url = %request.url,
                state = %*state,
                "skipping cache write from inactive version"
            );
            return;
        }

        if let Err(e) = self.storage.put(&self.namespace_id, request, response).await {
            warn!(
                namespace = %self.namespace_id,
                url = %request.url,
                error = %e,
                "failed to update cache entry"
            );
        }
    }
}

/// Cache manager for one version. Clones share the same instance.
#[derive(Clone)]
pub struct AssetCacheManager {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for AssetCacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetCacheManager")
            .field("namespace", &self.shared.namespace_id)
            .field("origin", &self.shared.origin.as_str())
            .finish()
    }
}

impl AssetCacheManager {
    /// Create a manager in the `Installing` state.
    pub fn new(
        config: CacheConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn Fetcher>,
    ) -> CacheResult<Self> {
        let origin = config.origin_url()?;
        let namespace = config.namespace();
        let namespace_id = namespace.id();

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                namespace,
                namespace_id,
                origin,
                storage,
                fetcher,
                state: RwLock::new(LifecycleState::Installing),
                promotion_requested: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.shared.config
    }

    pub fn namespace(&self) -> &CacheNamespace {
        &self.shared.namespace
    }

    pub fn namespace_id(&self) -> &str {
        &self.shared.namespace_id
    }

    pub fn origin(&self) -> &Url {
        &self.shared.origin
    }

    pub async fn state(&self) -> LifecycleState {
        *self.shared.state.read().await
    }

    /// Whether this version asked to be promoted without waiting for consumers
    /// of the previous version to go away.
    pub fn wants_immediate_promotion(&self) -> bool {
        self.shared.config.skip_waiting || self.shared.promotion_requested.load(Ordering::SeqCst)
    }

    /// Fetch and store every critical asset, then move to `Waiting`.
    ///
    /// Fetches run concurrently; the first failure (transport error or
    /// non-success status) abandons the install. The namespace is created and
    /// written only once every asset was fetched. A failed manager becomes
    /// `Redundant`.
    pub async fn on_install(&self) -> CacheResult<InstallReport> {
        let state = self.state().await;
        if state != LifecycleState::Installing {
            return Err(CacheError::Config {
                message: format!(
                    "cannot install {} from state {}",
                    self.shared.namespace_id, state
                ),
            });
        }

        let namespace = self.shared.namespace_id.as_str();
        info!(
            namespace,
            assets = self.shared.config.critical_assets.len(),
            "caching critical assets"
        );

        match self.populate(namespace).await {
            Ok(assets) => {
                *self.shared.state.write().await = LifecycleState::Waiting;
                info!(namespace, assets, "install complete");
                Ok(InstallReport {
                    namespace: namespace.to_string(),
                    assets,
                })
            }
            Err(e) => Err(self.fail_install(e).await),
        }
    }

    async fn populate(&self, namespace: &str) -> CacheResult<usize> {
        let storage = &self.shared.storage;
        let fetcher = &self.shared.fetcher;
        let urls = self.shared.config.critical_asset_urls()?;

        let fetches = self
            .shared
            .config
            .critical_assets
            .iter()
            .zip(urls)
            .map(|(asset, url)| async move {
                let request = AssetRequest::get(url);
                let install_error = |message: String| CacheError::Install {
                    namespace: namespace.to_string(),
                    asset: asset.clone(),
                    message,
                };

                let response = fetcher
                    .fetch(&request)
                    .await
                    .map_err(|e| install_error(e.to_string()))?;
                if !response.is_success() {
                    return Err(install_error(format!("HTTP {}", response.status)));
                }
                debug!(namespace, asset = %asset, "fetched critical asset");
                Ok((request, response))
            });

        let entries = try_join_all(fetches).await?;

        let store_error = |e: CacheError| CacheError::Install {
            namespace: namespace.to_string(),
            asset: "*".to_string(),
            message: e.to_string(),
        };
        storage.open(namespace).await.map_err(store_error)?;
        storage
            .put_all(namespace, &entries)
            .await
            .map_err(store_error)?;

        Ok(entries.len())
    }

    /// The namespace is left alone: another installer of the same version may
    /// own it.
    async fn fail_install(&self, error: CacheError) -> CacheError {
        let namespace = self.shared.namespace_id.as_str();
        *self.shared.state.write().await = LifecycleState::Redundant;

        warn!(namespace, error = %error, "install failed");
        error
    }

    /// Become the current version and reclaim every other namespace.
    ///
    /// Returns the identifiers of the deleted namespaces.
    pub async fn on_activate(&self) -> CacheResult<Vec<String>> {
        let namespace = self.shared.namespace_id.as_str();
        {
            let mut state = self.shared.state.write().await;
            match *state {
                LifecycleState::Waiting => *state = LifecycleState::Active,
                LifecycleState::Active => return Ok(Vec::new()),
                other => {
                    return Err(CacheError::Config {
                        message: format!("cannot activate {} from state {}", namespace, other),
                    })
                }
            }
        }

        let storage = &self.shared.storage;
        let stale: Vec<String> = storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| name != namespace)
            .collect();

        let deletions = stale.iter().map(|name| async move {
            info!(namespace = %name, "deleting old cache");
            storage.delete(name).await
        });
        try_join_all(deletions).await?;

        info!(namespace, deleted = stale.len(), "activated");
        Ok(stale)
    }

    /// Re-adopt an already installed namespace as `Active` (e.g., after a host
    /// restart) without fetching anything.
    pub async fn resume_active(&self) -> CacheResult<()> {
        let namespace = self.shared.namespace_id.as_str();
        if !self.shared.storage.has(namespace).await? {
            return Err(CacheError::NotInstalled {
                namespace: namespace.to_string(),
            });
        }

        let mut state = self.shared.state.write().await;
        match *state {
            LifecycleState::Installing | LifecycleState::Waiting => {
                *state = LifecycleState::Active;
                debug!(namespace, "resumed active namespace");
                Ok(())
            }
            LifecycleState::Active => Ok(()),
            other => Err(CacheError::Config {
                message: format!("cannot resume {} from state {}", namespace, other),
            }),
        }
    }

    /// Intercept a request.
    ///
    /// Same-origin `GET`s handled by an `Active` manager are answered from the
    /// namespace when possible while the network refresh runs in the
    /// background. A cold miss waits for the network, and a network failure
    /// on a cold miss is the only error a consumer ever sees.
    pub async fn on_fetch(&self, request: AssetRequest) -> CacheResult<FetchOutcome> {
        if request.method != Method::GET || !request.is_same_origin(&self.shared.origin) {
            return Ok(FetchOutcome::Passthrough(request));
        }
        if self.state().await != LifecycleState::Active {
            return Ok(FetchOutcome::Passthrough(request));
        }

        let namespace = self.shared.namespace_id.as_str();
        let cached = match self
            .shared
            .storage
            .match_request(namespace, &request)
            .await
        {
            Ok(cached) => cached,
            Err(e) => {
                warn!(namespace, url = %request.url, error = %e, "cache lookup failed; treating as miss");
                None
            }
        };

        let revalidation = self.spawn_revalidation(request.clone());

        match cached {
            Some(response) => {
                debug!(namespace, url = %request.url, "cache hit");
                Ok(FetchOutcome::Cached {
                    response,
                    revalidation,
                })
            }
            None => {
                debug!(namespace, url = %request.url, "cache miss");
                revalidation.settled().await.map(FetchOutcome::Network)
            }
        }
    }

    fn spawn_revalidation(&self, request: AssetRequest) -> Revalidation {
        let shared = Arc::clone(&self.shared);
        let url = request.url.to_string();

        let handle = tokio::spawn(async move {
            let response = match shared.fetcher.fetch(&request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %request.url, error = %e, "network refresh failed; keeping cached entry");
                    return Err(e);
                }
            };

            if response.is_cacheable() {
                shared.store_if_active(&request, &response).await;
            }
            Ok(response)
        });

        Revalidation { url, handle }
    }

    /// Handle a control message. Returns `true` when the host should promote
    /// this version now.
    pub async fn on_message(&self, message: ControlMessage) -> bool {
        match message {
            ControlMessage::SkipWaiting => {
                let state = self.state().await;
                match state {
                    LifecycleState::Installing | LifecycleState::Waiting => {
                        self.shared.promotion_requested.store(true, Ordering::SeqCst);
                        info!(namespace = %self.shared.namespace_id, %state, "skip waiting requested");
                        state == LifecycleState::Waiting
                    }
                    _ => {
                        debug!(namespace = %self.shared.namespace_id, %state, "skip waiting ignored");
                        false
                    }
                }
            }
        }
    }

    /// Stop serving: an `Active` manager becomes `Superseded`. Waits for
    /// in-flight cache writes of this version to finish.
    pub(crate) async fn supersede(&self) {
        let mut state = self.shared.state.write().await;
        if *state == LifecycleState::Active {
            *state = LifecycleState::Superseded;
            info!(namespace = %self.shared.namespace_id, "superseded");
        }
    }

    /// A version replaced before it was ever promoted.
    pub(crate) async fn mark_redundant(&self) {
        let mut state = self.shared.state.write().await;
        if matches!(*state, LifecycleState::Installing | LifecycleState::Waiting) {
            *state = LifecycleState::Redundant;
            debug!(namespace = %self.shared.namespace_id, "redundant");
        }
    }
}
