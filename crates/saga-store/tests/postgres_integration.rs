//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p saga-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{Tenant, TenantId, TransactionId};
use saga_store::{PostgresSagaStore, SagaRecord, SagaStatus, SagaStore, SagaStoreError, Version};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!("../../../migrations/001_create_sagas_table.sql"))
                .execute(&temp_pool)
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and a cleared table
async fn get_test_store() -> PostgresSagaStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE sagas")
        .execute(&pool)
        .await
        .unwrap();

    PostgresSagaStore::new(pool)
}

fn tenant() -> Tenant {
    Tenant::new(TenantId::new(), "GMS", 83, 1)
}

fn make_record(tenant: &Tenant, timeout_in: Duration) -> SagaRecord {
    let now = Utc::now();
    SagaRecord {
        tenant: tenant.clone(),
        transaction_id: TransactionId::new(),
        saga_type: "inventory_transaction".to_string(),
        initiated_by: "integration-test".to_string(),
        status: SagaStatus::Active,
        data: serde_json::json!({"steps": [{"stepId": "one"}]}),
        version: Version::initial(),
        created_at: now,
        updated_at: now,
        timeout_at: now + timeout_in,
    }
}

#[tokio::test]
#[serial]
async fn insert_and_load_saga() {
    let store = get_test_store().await;
    let tenant = tenant();
    let record = make_record(&tenant, Duration::minutes(5));

    let version = store.put(&record).await.unwrap();
    assert_eq!(version, Version::first());

    let loaded = store
        .get(tenant.id, record.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.tenant, tenant);
    assert_eq!(loaded.saga_type, "inventory_transaction");
    assert_eq!(loaded.data, record.data);
    assert_eq!(loaded.version, Version::first());
}

#[tokio::test]
#[serial]
async fn concurrent_updates_yield_one_conflict() {
    let store = get_test_store().await;
    let tenant = tenant();
    let mut record = make_record(&tenant, Duration::minutes(5));
    record.version = store.put(&record).await.unwrap();

    let mut first = record.clone();
    first.data = serde_json::json!({"writer": 1});
    let mut second = record.clone();
    second.data = serde_json::json!({"writer": 2});

    let (a, b) = tokio::join!(store.put(&first), store.put(&second));
    let outcomes = [a, b];
    let successes = outcomes.iter().filter(|r| r.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|r| matches!(r, Err(SagaStoreError::VersionConflict { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);

    let loaded = store
        .get(tenant.id, record.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.version, Version::new(2));
}

#[tokio::test]
#[serial]
async fn duplicate_insert_is_a_conflict() {
    let store = get_test_store().await;
    let record = make_record(&tenant(), Duration::minutes(5));

    store.put(&record).await.unwrap();
    let err = store.put(&record).await.unwrap_err();
    assert!(err.is_version_conflict());
}

#[tokio::test]
#[serial]
async fn terminal_sagas_are_not_listed() {
    let store = get_test_store().await;
    let tenant = tenant();
    let completed = make_record(&tenant, Duration::minutes(5));
    let failed = make_record(&tenant, Duration::minutes(5));
    let live = make_record(&tenant, Duration::minutes(5));
    for record in [&completed, &failed, &live] {
        store.put(record).await.unwrap();
    }

    store
        .mark_completed(tenant.id, completed.transaction_id)
        .await
        .unwrap();
    store
        .mark_failed(tenant.id, failed.transaction_id)
        .await
        .unwrap();

    let listed = store.get_all(tenant.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].transaction_id, live.transaction_id);

    let failed_row = store
        .get(tenant.id, failed.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(failed_row.status, SagaStatus::Failed);
}

#[tokio::test]
#[serial]
async fn claim_timed_out_skips_fresh_and_claimed_rows() {
    let store = get_test_store().await;
    let tenant = tenant();
    let expired = make_record(&tenant, Duration::seconds(-1));
    let fresh = make_record(&tenant, Duration::minutes(5));
    store.put(&expired).await.unwrap();
    store.put(&fresh).await.unwrap();

    let now = Utc::now();
    let claimed = store
        .claim_timed_out(now, Duration::seconds(30), 10)
        .await
        .unwrap();
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].transaction_id, expired.transaction_id);
    assert_eq!(claimed[0].version, Version::new(2));

    let second = store
        .claim_timed_out(now, Duration::seconds(30), 10)
        .await
        .unwrap();
    assert!(second.is_empty());
}

#[tokio::test]
#[serial]
async fn compensating_sagas_are_not_claimed() {
    let store = get_test_store().await;
    let mut record = make_record(&tenant(), Duration::seconds(-1));
    record.status = SagaStatus::Compensating;
    store.put(&record).await.unwrap();

    let claimed = store
        .claim_timed_out(Utc::now(), Duration::seconds(30), 10)
        .await
        .unwrap();
    assert!(claimed.is_empty());
    assert_eq!(store.get_all_active().await.unwrap().len(), 1);
}
