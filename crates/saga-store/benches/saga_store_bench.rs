use chrono::{Duration, Utc};
use common::{Tenant, TenantId, TransactionId};
use criterion::{Criterion, criterion_group, criterion_main};
use saga_store::{InMemorySagaStore, SagaRecord, SagaStatus, SagaStore, Version};

fn make_record(tenant: &Tenant) -> SagaRecord {
    let now = Utc::now();
    SagaRecord {
        tenant: tenant.clone(),
        transaction_id: TransactionId::new(),
        saga_type: "inventory_transaction".to_string(),
        initiated_by: "bench".to_string(),
        status: SagaStatus::Active,
        data: serde_json::json!({
            "steps": [
                {"stepId": "reserve", "status": "completed"},
                {"stepId": "award", "status": "pending"}
            ]
        }),
        version: Version::initial(),
        created_at: now,
        updated_at: now,
        timeout_at: now + Duration::minutes(5),
    }
}

fn bench_insert(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);

    c.bench_function("saga_store/insert", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemorySagaStore::new();
                store.put(&make_record(&tenant)).await.unwrap();
            });
        });
    });
}

fn bench_optimistic_update(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);

    c.bench_function("saga_store/optimistic_update_10", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemorySagaStore::new();
                let mut record = make_record(&tenant);
                record.version = store.put(&record).await.unwrap();
                for _ in 0..10 {
                    record.version = store.put(&record).await.unwrap();
                }
            });
        });
    });
}

fn bench_claim_timed_out(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);

    let store = rt.block_on(async {
        let store = InMemorySagaStore::new();
        for _ in 0..1000 {
            store.put(&make_record(&tenant)).await.unwrap();
        }
        store
    });

    c.bench_function("saga_store/claim_timed_out_1000_none_due", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .claim_timed_out(Utc::now(), Duration::seconds(30), 100)
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_insert,
    bench_optimistic_update,
    bench_claim_timed_out
);
criterion_main!(benches);
