//! Integration tests for the orchestrator HTTP surface and wiring.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use bus::{InMemoryBus, Message, Publisher, Topic};
use common::{Tenant, TenantId, TransactionId};
use drops::InMemoryDropRegistry;
use inventory::InMemoryInventoryRepository;
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::config::Config;
use orchestrator::routes::sagas::{AppState, TENANT_ID_HEADER};
use orchestrator::runtime::{Backends, Catalog, Runtime};
use saga::action::{AwardItemPayload, ItemPayload};
use saga::{Action, Saga, SagaEngine, SagaType};
use saga_store::{InMemorySagaStore, SagaStatus};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

type Engine = SagaEngine<InMemorySagaStore, InMemoryBus>;

fn setup() -> (axum::Router, Arc<Engine>) {
    let engine = Arc::new(SagaEngine::new(
        Arc::new(InMemorySagaStore::new()),
        InMemoryBus::new(),
    ));
    let state = Arc::new(AppState {
        engine: engine.clone(),
    });
    (orchestrator::create_app(state, get_metrics_handle()), engine)
}

fn award_saga() -> Saga {
    Saga::builder(SagaType::InventoryTransaction, "test")
        .step(
            "award",
            Action::AwardAsset(AwardItemPayload {
                character_id: 42,
                item: ItemPayload {
                    template_id: 2000000,
                    quantity: 5,
                    expiration: None,
                },
            }),
        )
        .build()
        .unwrap()
}

async fn get(app: axum::Router, uri: &str, tenant: Option<TenantId>) -> (StatusCode, serde_json::Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(tenant_id) = tenant {
        request = request.header(TENANT_ID_HEADER, tenant_id.to_string());
    }
    let response = app
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();
    let (status, json) = get(app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();
    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_list_requires_tenant_header() {
    let (app, _) = setup();
    let (status, json) = get(app, "/sagas", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains(TENANT_ID_HEADER));
}

#[tokio::test]
async fn test_list_and_get_active_saga() {
    let (app, engine) = setup();
    let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);
    let tx = engine.put(&tenant, award_saga()).await.unwrap();

    let (status, json) = get(app.clone(), "/sagas", Some(tenant.id)).await;
    assert_eq!(status, StatusCode::OK);
    let sagas = json.as_array().unwrap();
    assert_eq!(sagas.len(), 1);
    assert_eq!(sagas[0]["transactionId"], tx.to_string());
    assert_eq!(sagas[0]["status"], "active");

    let (status, json) = get(app.clone(), &format!("/sagas/{tx}"), Some(tenant.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["sagaType"], "inventory_transaction");
    assert_eq!(json["steps"][0]["stepId"], "award");

    let (status, json) = get(app, "/sagas", Some(TenantId::new())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_is_tenant_scoped() {
    let (app, engine) = setup();
    let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);
    let tx = engine.put(&tenant, award_saga()).await.unwrap();

    let (status, _) = get(app, &format!("/sagas/{tx}"), Some(TenantId::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_get_unknown_and_malformed_ids() {
    let (app, _) = setup();
    let tenant_id = TenantId::new();

    let uri = format!("/sagas/{}", TransactionId::new());
    let (status, _) = get(app.clone(), &uri, Some(tenant_id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(app, "/sagas/not-a-uuid", Some(tenant_id)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_runtime_completes_submitted_saga() {
    let bus = InMemoryBus::new();
    let backends = Backends {
        sagas: Arc::new(InMemorySagaStore::new()),
        inventory: Arc::new(InMemoryInventoryRepository::new()),
        drops: Arc::new(InMemoryDropRegistry::new()),
    };
    let runtime = Runtime::start(&Config::default(), bus.clone(), backends, Catalog::empty())
        .await
        .unwrap();

    let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);
    let saga = award_saga();
    let tx = saga.transaction_id;
    bus.publish(vec![Message::new(Topic::CommandSaga, tx, &tenant, &saga).unwrap()])
        .await
        .unwrap();

    let mut status = None;
    for _ in 0..100 {
        status = runtime
            .engine()
            .get(tenant.id, tx)
            .await
            .unwrap()
            .map(|s| s.status);
        if status == Some(SagaStatus::Completed) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, Some(SagaStatus::Completed));

    let state = Arc::new(AppState {
        engine: runtime.engine().clone(),
    });
    let app = orchestrator::create_app(state, get_metrics_handle());
    let (code, json) = get(app, &format!("/sagas/{tx}"), Some(tenant.id)).await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(json["status"], "completed");

    runtime.shutdown().await;
}
