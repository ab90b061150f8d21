//! Integration Tests for API Endpoints
//!
//! Drives the full router: read-through on GET, ingestion through the queue
//! and workers on POST, and the error mapping of store failures.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use order_cache::{
    api::create_router,
    models::{Order, OrderValidator},
    spawn_consumers,
    store::{MemoryOrderStore, OrderStore, StoreError},
    tasks::ingest_channel,
    AppState, OrderCache,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

// == Helper Functions ==

fn order_json(uid: &str, created: &str) -> Value {
    json!({
        "order_uid": uid,
        "track_number": "WBILMTESTTRACK",
        "entry": "WBIL",
        "delivery": {
            "name": "Test Testov",
            "phone": "+9720000000",
            "zip": "2639809",
            "city": "Kiryat Mozkin",
            "address": "Ploshad Mira 15",
            "region": "Kraiot",
            "email": "test@gmail.com"
        },
        "payment": {
            "transaction": uid,
            "request_id": "",
            "currency": "USD",
            "provider": "wbpay",
            "amount": 1817,
            "payment_dt": created,
            "bank": "alpha",
            "delivery_cost": 1500,
            "goods_total": 317,
            "custom_fee": 0
        },
        "items": [{
            "chrt_id": 9934930,
            "track_number": "WBILMTESTTRACK",
            "price": 453,
            "rid": format!("{}-rid", uid),
            "name": "Mascaras",
            "sale": 30,
            "size": "0",
            "total_price": 317,
            "nm_id": 2389212,
            "brand": "Vivienne Sabo",
            "status": 202
        }],
        "locale": "en",
        "internal_signature": "",
        "customer_id": "test",
        "delivery_service": "meest",
        "shardkey": "9",
        "sm_id": 99,
        "date_created": created,
        "oof_shard": "1"
    })
}

fn order(uid: &str) -> Order {
    serde_json::from_value(order_json(uid, "2021-11-26T06:22:19Z")).unwrap()
}

struct TestApp {
    router: Router,
    cache: Arc<OrderCache>,
    shutdown: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl TestApp {
    fn new(store: Arc<dyn OrderStore>, capacity: usize) -> Self {
        let cache = Arc::new(OrderCache::new(store, NonZeroUsize::new(capacity).unwrap()));
        let (publisher, source) = ingest_channel(16);
        let shutdown = CancellationToken::new();
        let workers = spawn_consumers(
            1,
            Arc::new(source),
            cache.clone(),
            OrderValidator::new(),
            shutdown.clone(),
        );
        let router = create_router(AppState::new(cache.clone(), publisher));

        Self {
            router,
            cache,
            shutdown,
            workers,
        }
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_to_json(response.into_body()).await)
    }

    async fn post_order(&self, body: String) -> StatusCode {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    /// Polls until the order is cached or the deadline passes.
    async fn wait_cached(&self, uid: &str) -> bool {
        for _ in 0..100 {
            if self.cache.contains(uid).await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    async fn shutdown(self) {
        self.shutdown.cancel();
        for worker in self.workers {
            worker.await.unwrap();
        }
    }
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Store whose every call fails, standing in for an unreachable database.
struct BrokenStore;

#[async_trait]
impl OrderStore for BrokenStore {
    async fn fetch_by_uid(&self, _uid: &str) -> Result<Order, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn fetch_recent(&self, _n: usize) -> Result<Vec<Order>, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn persist(&self, _order: &Order) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }
}

// == Read Path ==

#[tokio::test]
async fn test_get_order_reads_through_store() {
    let store = Arc::new(MemoryOrderStore::with_orders(vec![order("b563feb7b2b84b6test")]));
    let app = TestApp::new(store, 10);

    let (status, json) = app.get("/order/b563feb7b2b84b6test").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["order_uid"], "b563feb7b2b84b6test");
    assert_eq!(json["delivery"]["city"], "Kiryat Mozkin");
    assert_eq!(json["items"][0]["brand"], "Vivienne Sabo");
    assert!(app.cache.contains("b563feb7b2b84b6test").await);

    app.shutdown().await;
}

#[tokio::test]
async fn test_get_missing_order_is_404() {
    let app = TestApp::new(Arc::new(MemoryOrderStore::new()), 10);

    let (status, json) = app.get("/order/nope").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nope"));

    app.shutdown().await;
}

#[tokio::test]
async fn test_store_failure_is_generic_500() {
    let app = TestApp::new(Arc::new(BrokenStore), 10);

    let (status, json) = app.get("/order/any").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "internal server error");

    app.shutdown().await;
}

// == Ingestion Path ==

#[tokio::test]
async fn test_posted_order_is_ingested_and_readable() {
    let store = Arc::new(MemoryOrderStore::new());
    let app = TestApp::new(store.clone(), 10);

    let status = app
        .post_order(order_json("ingested", "2021-11-26T06:22:19Z").to_string())
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(app.wait_cached("ingested").await, "order never reached the cache");

    let (status, json) = app.get("/order/ingested").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["payment"]["transaction"], "ingested");
    assert!(store.fetch_by_uid("ingested").await.is_ok());

    app.shutdown().await;
}

#[tokio::test]
async fn test_invalid_order_is_dropped() {
    let store = Arc::new(MemoryOrderStore::new());
    let app = TestApp::new(store.clone(), 10);

    let mut invalid = order_json("invalid", "2021-11-26T06:22:19Z");
    invalid["locale"] = json!("english");
    app.post_order(invalid.to_string()).await;
    app.post_order("garbage".to_string()).await;
    app.post_order(order_json("valid", "2021-11-26T06:22:19Z").to_string())
        .await;

    // Single worker drains in order, so "valid" arriving means the rest were handled
    assert!(app.wait_cached("valid").await);
    assert_eq!(store.len().await, 1);

    let (status, _) = app.get("/order/invalid").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.shutdown().await;
}

#[tokio::test]
async fn test_save_failure_leaves_order_uncached() {
    let app = TestApp::new(Arc::new(BrokenStore), 10);

    app.post_order(order_json("lost", "2021-11-26T06:22:19Z").to_string())
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!app.cache.contains("lost").await);

    app.shutdown().await;
}

// == Startup Load and Eviction ==

#[tokio::test]
async fn test_load_then_evict_through_http() {
    let store = Arc::new(MemoryOrderStore::with_orders(vec![
        serde_json::from_value::<Order>(order_json("first", "2021-11-26T06:00:00Z")).unwrap(),
        serde_json::from_value::<Order>(order_json("second", "2021-11-26T07:00:00Z")).unwrap(),
        serde_json::from_value::<Order>(order_json("third", "2021-11-26T08:00:00Z")).unwrap(),
    ]));
    let app = TestApp::new(store, 2);

    let loaded = app.cache.load(&CancellationToken::new()).await.unwrap();
    assert_eq!(loaded, 2);
    assert!(app.cache.contains("third").await);
    assert!(app.cache.contains("second").await);

    // Reading "first" misses, reads through, and evicts the oldest loaded entry
    let (status, _) = app.get("/order/first").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.cache.len().await, 2);
    assert!(app.cache.contains("first").await);

    let (status, json) = app.get("/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["loaded"], 2);
    assert_eq!(json["evictions"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["capacity"], 2);

    app.shutdown().await;
}

#[tokio::test]
async fn test_load_failure_is_reported() {
    let cache = OrderCache::new(Arc::new(BrokenStore), NonZeroUsize::new(4).unwrap());

    let err = cache.load(&CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        order_cache::CacheError::BackingStoreUnavailable(_)
    ));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::new(Arc::new(MemoryOrderStore::new()), 1);

    let (status, json) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");

    app.shutdown().await;
}
