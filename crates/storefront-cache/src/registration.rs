//! Host-side lifecycle driver.
//!
//! A [`Registration`] plays the role the browser plays for a service worker:
//! it installs new versions, keeps at most one active and one waiting
//! manager, tracks which consumers are controlled, and promotes a waiting
//! version once nothing holds on to the old one (or when asked to via
//! `SKIP_WAITING`).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::fetch::Fetcher;
use crate::manager::{AssetCacheManager, FetchOutcome};
use crate::storage::CacheStorage;
use crate::types::{AssetRequest, ControlMessage};

/// Identifier of a consumer (an open page).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

#[derive(Default)]
struct RegistrationState {
    active: Option<AssetCacheManager>,
    waiting: Option<AssetCacheManager>,
    /// Connected consumers and whether the active version controls them.
    clients: HashMap<ClientId, bool>,
    next_client: u64,
}

impl RegistrationState {
    fn controlled_count(&self) -> usize {
        self.clients.values().filter(|controlled| **controlled).count()
    }
}

/// Lifecycle driver for cache manager versions sharing one storage.
pub struct Registration {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    inner: Mutex<RegistrationState>,
}

impl Registration {
    pub fn new(storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            storage,
            fetcher,
            inner: Mutex::new(RegistrationState::default()),
        }
    }

    /// Install a new version and promote it if nothing stands in the way.
    ///
    /// A failed install leaves the registration untouched: whatever was active
    /// keeps serving. Registering the namespace that is already active is a
    /// no-op returning the active manager.
    pub async fn register(&self, config: CacheConfig) -> CacheResult<AssetCacheManager> {
        {
            let inner = self.inner.lock().await;
            if let Some(active) = &inner.active {
                if active.namespace() == &config.namespace() {
                    debug!(namespace = %active.namespace_id(), "version already active");
                    return Ok(active.clone());
                }
            }
        }

        let manager = AssetCacheManager::new(
            config,
            Arc::clone(&self.storage),
            Arc::clone(&self.fetcher),
        )?;
        manager.on_install().await?;

        let mut inner = self.inner.lock().await;
        if let Some(previous) = inner.waiting.replace(manager.clone()) {
            previous.mark_redundant().await;
        }

        let promote = inner.active.is_none()
            || inner.controlled_count() == 0
            || manager.wants_immediate_promotion();
        if promote {
            Self::promote_locked(&mut inner).await?;
        } else {
            info!(
                namespace = %manager.namespace_id(),
                controlled = inner.controlled_count(),
                "installed; waiting for consumers of previous version"
            );
        }

        Ok(manager)
    }

    /// Waiting → Active for the waiting manager. The caller holds the lock, so
    /// no other promotion or registration can interleave.
    async fn promote_locked(inner: &mut RegistrationState) -> CacheResult<bool> {
        let Some(next) = inner.waiting.take() else {
            return Ok(false);
        };

        if let Some(previous) = inner.active.take() {
            previous.supersede().await;
        }

        let activation = next.on_activate().await;

        if next.config().claim_clients {
            for controlled in inner.clients.values_mut() {
                *controlled = true;
            }
        }
        info!(
            namespace = %next.namespace_id(),
            controlled = inner.controlled_count(),
            "promoted"
        );
        inner.active = Some(next);

        activation.map(|_| true)
    }

    /// A consumer opened. It is controlled only if a version is already active.
    pub async fn connect(&self) -> ClientId {
        let mut inner = self.inner.lock().await;
        let id = ClientId(inner.next_client);
        inner.next_client += 1;
        let controlled = inner.active.is_some();
        inner.clients.insert(id, controlled);
        id
    }

    /// A consumer closed. When the last controlled consumer goes away, a
    /// waiting version is promoted. Returns whether a promotion happened.
    pub async fn disconnect(&self, client: ClientId) -> CacheResult<bool> {
        let mut inner = self.inner.lock().await;
        if inner.clients.remove(&client).is_none() {
            return Ok(false);
        }

        if inner.waiting.is_some() && inner.controlled_count() == 0 {
            return Self::promote_locked(&mut inner).await;
        }
        Ok(false)
    }

    /// Deliver a page message to the waiting version. Malformed or unknown
    /// messages are ignored. Returns whether a promotion happened.
    pub async fn post_message(&self, raw: &str) -> CacheResult<bool> {
        let Some(message) = ControlMessage::parse(raw) else {
            debug!("ignoring unrecognized control message");
            return Ok(false);
        };

        let mut inner = self.inner.lock().await;
        let Some(waiting) = inner.waiting.clone() else {
            debug!("no waiting version for control message");
            return Ok(false);
        };

        if waiting.on_message(message).await {
            Self::promote_locked(&mut inner).await
        } else {
            Ok(false)
        }
    }

    /// Route a request from `client` through the active version.
    ///
    /// Uncontrolled or unknown consumers, and every request while no version
    /// is active, pass through.
    pub async fn fetch(&self, client: ClientId, request: AssetRequest) -> CacheResult<FetchOutcome> {
        let active = {
            let inner = self.inner.lock().await;
            match (inner.clients.get(&client), &inner.active) {
                (Some(true), Some(active)) => active.clone(),
                _ => return Ok(FetchOutcome::Passthrough(request)),
            }
        };
        active.on_fetch(request).await
    }

    pub async fn active(&self) -> Option<AssetCacheManager> {
        self.inner.lock().await.active.clone()
    }

    pub async fn waiting(&self) -> Option<AssetCacheManager> {
        self.inner.lock().await.waiting.clone()
    }

    pub async fn is_controlled(&self, client: ClientId) -> bool {
        self.inner
            .lock()
            .await
            .clients
            .get(&client)
            .copied()
            .unwrap_or(false)
    }

    pub async fn controlled_clients(&self) -> usize {
        self.inner.lock().await.controlled_count()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as Routes;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use url::Url;

    use super::*;
    use crate::error::CacheError;
    use crate::manager::ResponseSource;
    use crate::storage::MemoryCacheStorage;
    use crate::types::{LifecycleState, StoredResponse};

    const ORIGIN: &str = "https://shop.example";

    /// Serves `{path}` bodies from a mutable table; anything else fails.
    #[derive(Default)]
    struct TableFetcher {
        routes: StdMutex<Routes<String, (u16, String)>>,
    }

    impl TableFetcher {
        fn set(&self, path: &str, status: u16, body: &str) {
            self.routes
                .lock()
                .unwrap()
                .insert(path.to_string(), (status, body.to_string()));
        }
    }

    #[async_trait]
    impl Fetcher for TableFetcher {
        async fn fetch(&self, request: &AssetRequest) -> CacheResult<StoredResponse> {
            let entry = self.routes.lock().unwrap().get(request.url.path()).cloned();
            match entry {
                Some((status, body)) => Ok(StoredResponse::new(status, body)),
                None => Err(CacheError::Network {
                    url: request.url.to_string(),
                    message: "offline".to_string(),
                }),
            }
        }
    }

    fn config(version: &str) -> CacheConfig {
        CacheConfig::default()
            .with_origin(ORIGIN)
            .with_version(version)
            .with_critical_assets(["/", "/index.html"])
    }

    fn get(path: &str) -> AssetRequest {
        AssetRequest::get(Url::parse(ORIGIN).unwrap().join(path).unwrap())
    }

    fn setup() -> (Registration, MemoryCacheStorage, Arc<TableFetcher>) {
        let storage = MemoryCacheStorage::new();
        let fetcher = Arc::new(TableFetcher::default());
        fetcher.set("/", 200, "home v1");
        fetcher.set("/index.html", 200, "index v1");
        let registration = Registration::new(Arc::new(storage.clone()), fetcher.clone());
        (registration, storage, fetcher)
    }

    #[tokio::test]
    async fn test_first_version_activates_immediately() {
        let (registration, storage, _fetcher) = setup();
        let v1 = registration.register(config("v1")).await.unwrap();

        assert_eq!(v1.state().await, LifecycleState::Active);
        assert!(registration.waiting().await.is_none());
        assert_eq!(storage.keys().await.unwrap(), vec!["storefront-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_new_version_waits_for_controlled_consumers() {
        let (registration, storage, fetcher) = setup();
        let v1 = registration.register(config("v1")).await.unwrap();
        let page = registration.connect().await;
        assert!(registration.is_controlled(page).await);

        fetcher.set("/index.html", 200, "index v2");
        let v2 = registration.register(config("v2")).await.unwrap();

        assert_eq!(v2.state().await, LifecycleState::Waiting);
        assert_eq!(v1.state().await, LifecycleState::Active);
        // Both generations exist until promotion.
        assert_eq!(storage.keys().await.unwrap().len(), 2);

        // Page still served by v1.
        let outcome = registration.fetch(page, get("/index.html")).await.unwrap();
        assert_eq!(outcome.response().unwrap().body, "index v1");

        // Last consumer leaves: automatic promotion.
        assert!(registration.disconnect(page).await.unwrap());
        assert_eq!(v2.state().await, LifecycleState::Active);
        assert_eq!(v1.state().await, LifecycleState::Superseded);
        assert_eq!(storage.keys().await.unwrap(), vec!["storefront-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_skip_waiting_message_promotes_with_consumers_open() {
        let (registration, storage, _fetcher) = setup();
        let v1 = registration.register(config("v1")).await.unwrap();
        let page = registration.connect().await;
        let v2 = registration.register(config("v2")).await.unwrap();
        assert_eq!(v2.state().await, LifecycleState::Waiting);

        let promoted = registration
            .post_message(r#"{"type":"SKIP_WAITING"}"#)
            .await
            .unwrap();

        assert!(promoted);
        assert_eq!(v2.state().await, LifecycleState::Active);
        assert_eq!(v1.state().await, LifecycleState::Superseded);
        assert!(registration.is_controlled(page).await);
        assert_eq!(storage.keys().await.unwrap(), vec!["storefront-v2".to_string()]);

        let outcome = registration.fetch(page, get("/")).await.unwrap();
        assert_eq!(outcome.source(), ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_unknown_message_ignored() {
        let (registration, _storage, _fetcher) = setup();
        registration.register(config("v1")).await.unwrap();
        let _page = registration.connect().await;
        let v2 = registration.register(config("v2")).await.unwrap();

        assert!(!registration.post_message(r#"{"type":"RELOAD"}"#).await.unwrap());
        assert!(!registration.post_message("not json").await.unwrap());
        assert_eq!(v2.state().await, LifecycleState::Waiting);
    }

    #[tokio::test]
    async fn test_skip_waiting_config_promotes_on_install() {
        let (registration, _storage, _fetcher) = setup();
        registration.register(config("v1")).await.unwrap();
        let _page = registration.connect().await;

        let v2 = registration
            .register(config("v2").with_skip_waiting(true))
            .await
            .unwrap();
        assert_eq!(v2.state().await, LifecycleState::Active);
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_version_serving() {
        let (registration, storage, fetcher) = setup();
        let v1 = registration.register(config("v1")).await.unwrap();
        let page = registration.connect().await;

        fetcher.set("/index.html", 503, "maintenance");
        let err = registration.register(config("v2")).await.unwrap_err();
        assert!(matches!(err, CacheError::Install { .. }));

        assert!(registration.waiting().await.is_none());
        assert_eq!(v1.state().await, LifecycleState::Active);
        assert_eq!(storage.keys().await.unwrap(), vec!["storefront-v1".to_string()]);

        let outcome = registration.fetch(page, get("/")).await.unwrap();
        assert_eq!(outcome.response().unwrap().body, "home v1");
    }

    #[tokio::test]
    async fn test_newer_waiting_version_replaces_older_waiting() {
        let (registration, _storage, _fetcher) = setup();
        registration.register(config("v1")).await.unwrap();
        let _page = registration.connect().await;

        let v2 = registration.register(config("v2")).await.unwrap();
        let v3 = registration.register(config("v3")).await.unwrap();

        assert_eq!(v2.state().await, LifecycleState::Redundant);
        assert_eq!(v3.state().await, LifecycleState::Waiting);
        assert_eq!(
            registration.waiting().await.unwrap().namespace_id(),
            "storefront-v3"
        );
    }

    #[tokio::test]
    async fn test_uncontrolled_consumer_passes_through() {
        let (registration, _storage, _fetcher) = setup();
        let early = registration.connect().await;
        registration
            .register(config("v1").with_claim_clients(false))
            .await
            .unwrap();

        assert!(!registration.is_controlled(early).await);
        let outcome = registration.fetch(early, get("/")).await.unwrap();
        assert_eq!(outcome.source(), ResponseSource::Passthrough);

        let late = registration.connect().await;
        let outcome = registration.fetch(late, get("/")).await.unwrap();
        assert_eq!(outcome.source(), ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_claim_clients_takes_over_open_consumers() {
        let (registration, _storage, _fetcher) = setup();
        let early = registration.connect().await;
        registration.register(config("v1")).await.unwrap();

        assert!(registration.is_controlled(early).await);
        assert_eq!(registration.controlled_clients().await, 1);
    }

    #[tokio::test]
    async fn test_reregistering_active_version_is_noop() {
        let (registration, _storage, fetcher) = setup();
        let v1 = registration.register(config("v1")).await.unwrap();

        // Would fail if it were re-installed.
        fetcher.set("/", 500, "down");
        let again = registration.register(config("v1")).await.unwrap();
        assert_eq!(again.namespace_id(), v1.namespace_id());
        assert_eq!(v1.state().await, LifecycleState::Active);
    }
}
