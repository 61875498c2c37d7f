//! Integration tests for the asset cache against a mocked origin.
//!
//! Uses wiremock as the origin, the real reqwest fetcher, and the disk store.
//! Covers install, activation cleanup, stale-while-revalidate hits, refresh
//! failures, cold misses, and forced promotion.

use std::sync::Arc;
use std::time::Duration;

use storefront_cache::{
    AssetCacheManager, AssetRequest, CacheConfig, CacheError, CacheStorage, DiskCacheStorage,
    FetchOutcome, HttpFetcher, LifecycleState, Registration, ResponseSource,
};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/images/product/product-01-800.webp",
    "/fonts/montserrat-400.woff2",
];

async fn mount_assets(mock_server: &MockServer, tag: &str) {
    for asset in ASSETS {
        Mock::given(method("GET"))
            .and(path(*asset))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!("{} {}", tag, asset)))
            .mount(mock_server)
            .await;
    }
}

fn config(mock_server: &MockServer, version: &str) -> CacheConfig {
    CacheConfig::default()
        .with_origin(mock_server.uri())
        .with_version(version)
        .with_critical_assets(ASSETS.iter().copied())
        .with_timeout_secs(1)
}

fn request(mock_server: &MockServer, asset: &str) -> AssetRequest {
    AssetRequest::get(Url::parse(&mock_server.uri()).unwrap().join(asset).unwrap())
}

fn create_storage() -> (Arc<DiskCacheStorage>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(DiskCacheStorage::with_dir(temp_dir.path().join("assets")));
    (storage, temp_dir)
}

async fn installed_manager(
    mock_server: &MockServer,
    storage: Arc<DiskCacheStorage>,
) -> AssetCacheManager {
    let manager = AssetCacheManager::new(
        config(mock_server, "v1"),
        storage,
        Arc::new(HttpFetcher::new(1).unwrap()),
    )
    .unwrap();
    manager.on_install().await.unwrap();
    manager.on_activate().await.unwrap();
    manager
}

#[tokio::test]
async fn test_install_populates_namespace_without_further_network() {
    let mock_server = MockServer::start().await;
    for asset in ASSETS {
        Mock::given(method("GET"))
            .and(path(*asset))
            .respond_with(ResponseTemplate::new(200).set_body_string(*asset))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let (storage, _temp_dir) = create_storage();
    let manager = AssetCacheManager::new(
        config(&mock_server, "v1"),
        storage.clone(),
        Arc::new(HttpFetcher::new(5).unwrap()),
    )
    .unwrap();

    let report = manager.on_install().await.unwrap();
    assert_eq!(report.assets, ASSETS.len());
    assert_eq!(report.namespace, "storefront-v1");

    for asset in ASSETS {
        let hit = storage
            .match_request("storefront-v1", &request(&mock_server, asset))
            .await
            .unwrap()
            .expect("critical asset cached");
        assert_eq!(hit.body, *asset);
    }
    // `.expect(1)` on every mock verifies no extra network reads on drop.
}

#[tokio::test]
async fn test_install_fails_when_any_asset_missing() {
    let mock_server = MockServer::start().await;
    for asset in ASSETS.iter().filter(|a| **a != "/fonts/montserrat-400.woff2") {
        Mock::given(method("GET"))
            .and(path(*asset))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/fonts/montserrat-400.woff2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let (storage, _temp_dir) = create_storage();
    let manager = AssetCacheManager::new(
        config(&mock_server, "v1"),
        storage.clone(),
        Arc::new(HttpFetcher::new(5).unwrap()),
    )
    .unwrap();

    match manager.on_install().await {
        Err(CacheError::Install { asset, message, .. }) => {
            assert_eq!(asset, "/fonts/montserrat-400.woff2");
            assert_eq!(message, "HTTP 404");
        }
        other => panic!("expected install failure, got {:?}", other),
    }
    assert_eq!(manager.state().await, LifecycleState::Redundant);
    assert!(storage.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_activation_reclaims_previous_generation() {
    let mock_server = MockServer::start().await;
    mount_assets(&mock_server, "v1").await;

    let (storage, _temp_dir) = create_storage();
    let registration = Registration::new(storage.clone(), Arc::new(HttpFetcher::new(5).unwrap()));

    registration.register(config(&mock_server, "v1")).await.unwrap();
    let v2 = registration.register(config(&mock_server, "v2")).await.unwrap();

    assert_eq!(v2.state().await, LifecycleState::Active);
    assert_eq!(storage.keys().await.unwrap(), vec!["storefront-v2".to_string()]);
    for asset in ASSETS {
        let old = storage
            .match_request("storefront-v1", &request(&mock_server, asset))
            .await
            .unwrap();
        assert!(old.is_none(), "{} still cached under v1", asset);
    }
}

#[tokio::test]
async fn test_hit_returns_cached_then_updates_entry() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("old body"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("new body"))
        .with_priority(2)
        .mount(&mock_server)
        .await;
    mount_assets(&mock_server, "v1").await;

    let (storage, _temp_dir) = create_storage();
    let manager = installed_manager(&mock_server, storage).await;

    let first = manager
        .on_fetch(request(&mock_server, "/index.html"))
        .await
        .unwrap();
    assert_eq!(first.source(), ResponseSource::Cache);
    assert_eq!(first.response().unwrap().body, "old body");

    let FetchOutcome::Cached { revalidation, .. } = first else {
        panic!("expected cached outcome");
    };
    let refreshed = revalidation.settled().await.unwrap();
    assert_eq!(refreshed.body, "new body");

    let second = manager
        .on_fetch(request(&mock_server, "/index.html"))
        .await
        .unwrap();
    assert_eq!(second.source(), ResponseSource::Cache);
    assert_eq!(second.response().unwrap().body, "new body");
}

#[tokio::test]
async fn test_refresh_failure_serves_unchanged_cached_entry() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("cached body"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&mock_server)
        .await;
    // Slower than the fetcher timeout: a transport failure.
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("never seen")
                .set_delay(Duration::from_secs(3)),
        )
        .with_priority(2)
        .mount(&mock_server)
        .await;
    mount_assets(&mock_server, "v1").await;

    let (storage, _temp_dir) = create_storage();
    let manager = installed_manager(&mock_server, storage).await;

    let outcome = manager
        .on_fetch(request(&mock_server, "/index.html"))
        .await
        .unwrap();
    assert_eq!(outcome.response().unwrap().body, "cached body");

    let FetchOutcome::Cached { revalidation, .. } = outcome else {
        panic!("expected cached outcome");
    };
    assert!(matches!(
        revalidation.settled().await,
        Err(CacheError::Network { .. })
    ));

    let again = manager
        .on_fetch(request(&mock_server, "/index.html"))
        .await
        .unwrap();
    assert_eq!(again.response().unwrap().body, "cached body");
}

#[tokio::test]
async fn test_cold_miss_with_network_failure_is_an_error() {
    let mock_server = MockServer::start().await;
    mount_assets(&mock_server, "v1").await;
    Mock::given(method("GET"))
        .and(path("/images/product/product-02-800.webp"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let (storage, _temp_dir) = create_storage();
    let manager = installed_manager(&mock_server, storage).await;

    let result = manager
        .on_fetch(request(&mock_server, "/images/product/product-02-800.webp"))
        .await;
    assert!(
        matches!(result, Err(CacheError::Network { .. })),
        "expected network error, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_cold_miss_served_from_network_then_cached() {
    let mock_server = MockServer::start().await;
    mount_assets(&mock_server, "v1").await;
    Mock::given(method("GET"))
        .and(path("/images/product/product-03-800.webp"))
        .respond_with(ResponseTemplate::new(200).set_body_string("thumb"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let (storage, _temp_dir) = create_storage();
    let manager = installed_manager(&mock_server, storage).await;
    let req = request(&mock_server, "/images/product/product-03-800.webp");

    let miss = manager.on_fetch(req.clone()).await.unwrap();
    assert_eq!(miss.source(), ResponseSource::Network);

    let hit = manager.on_fetch(req).await.unwrap();
    assert_eq!(hit.source(), ResponseSource::Cache);
    assert_eq!(hit.response().unwrap().body, "thumb");
    if let FetchOutcome::Cached { revalidation, .. } = hit {
        revalidation.settled().await.unwrap();
    }
}

#[tokio::test]
async fn test_skip_waiting_promotes_over_open_page() {
    let mock_server = MockServer::start().await;
    mount_assets(&mock_server, "release").await;

    let (storage, _temp_dir) = create_storage();
    let registration = Registration::new(storage.clone(), Arc::new(HttpFetcher::new(5).unwrap()));

    registration.register(config(&mock_server, "v1")).await.unwrap();
    let page = registration.connect().await;
    let v2 = registration.register(config(&mock_server, "v2")).await.unwrap();
    assert_eq!(v2.state().await, LifecycleState::Waiting);

    assert!(registration
        .post_message(r#"{"type":"SKIP_WAITING"}"#)
        .await
        .unwrap());

    assert_eq!(v2.state().await, LifecycleState::Active);
    assert!(registration.is_controlled(page).await);
    assert_eq!(storage.keys().await.unwrap(), vec!["storefront-v2".to_string()]);
}
