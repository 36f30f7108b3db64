use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{TenantId, TransactionId};
use tokio::sync::RwLock;

use crate::{Result, SagaRecord, SagaStatus, SagaStore, SagaStoreError, Version};

/// In-memory saga store.
///
/// Provides the same optimistic semantics as the PostgreSQL store; used by
/// tests and by the orchestrator when no database is configured.
#[derive(Clone, Default)]
pub struct InMemorySagaStore {
    records: Arc<RwLock<HashMap<TransactionId, SagaRecord>>>,
}

impl InMemorySagaStore {
    /// Creates a new empty in-memory saga store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored sagas, terminal ones included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Clears all records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    async fn set_status(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        status: SagaStatus,
    ) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&transaction_id)
            .filter(|r| r.tenant.id == tenant_id)
            .ok_or(SagaStoreError::NotFound(transaction_id))?;
        record.status = status;
        record.version = record.version.next();
        record.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl SagaStore for InMemorySagaStore {
    async fn put(&self, record: &SagaRecord) -> Result<Version> {
        let mut records = self.records.write().await;

        if record.version.is_initial() {
            if records.contains_key(&record.transaction_id) {
                return Err(SagaStoreError::VersionConflict {
                    transaction_id: record.transaction_id,
                    expected: record.version,
                });
            }
            let mut stored = record.clone();
            stored.version = Version::first();
            records.insert(record.transaction_id, stored);
            return Ok(Version::first());
        }

        let Some(existing) = records.get_mut(&record.transaction_id) else {
            return Err(SagaStoreError::VersionConflict {
                transaction_id: record.transaction_id,
                expected: record.version,
            });
        };
        if existing.version != record.version {
            return Err(SagaStoreError::VersionConflict {
                transaction_id: record.transaction_id,
                expected: record.version,
            });
        }

        let next = record.version.next();
        *existing = SagaRecord {
            version: next,
            created_at: existing.created_at,
            updated_at: Utc::now(),
            ..record.clone()
        };
        Ok(next)
    }

    async fn get(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<Option<SagaRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(&transaction_id)
            .filter(|r| r.tenant.id == tenant_id)
            .cloned())
    }

    async fn get_all(&self, tenant_id: TenantId) -> Result<Vec<SagaRecord>> {
        let mut live: Vec<SagaRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.tenant.id == tenant_id && r.status.is_live())
            .cloned()
            .collect();
        live.sort_by_key(|r| r.created_at);
        Ok(live)
    }

    async fn get_all_active(&self) -> Result<Vec<SagaRecord>> {
        let mut live: Vec<SagaRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.status.is_live())
            .cloned()
            .collect();
        live.sort_by_key(|r| r.created_at);
        Ok(live)
    }

    async fn claim_timed_out(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: i64,
    ) -> Result<Vec<SagaRecord>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut records = self.records.write().await;

        let mut due: Vec<&mut SagaRecord> = records
            .values_mut()
            .filter(|r| r.status == SagaStatus::Active && r.is_timed_out(now))
            .collect();
        due.sort_by_key(|r| r.timeout_at);

        Ok(due
            .into_iter()
            .take(limit)
            .map(|record| {
                record.timeout_at = now + lease;
                record.version = record.version.next();
                record.clone()
            })
            .collect())
    }

    async fn mark_completed(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<()> {
        self.set_status(tenant_id, transaction_id, SagaStatus::Completed)
            .await
    }

    async fn mark_failed(&self, tenant_id: TenantId, transaction_id: TransactionId) -> Result<()> {
        self.set_status(tenant_id, transaction_id, SagaStatus::Failed)
            .await
    }
}

#[cfg(test)]
mod tests {
    use common::Tenant;

    use super::*;

    fn make_record(tenant: &Tenant, timeout_at: DateTime<Utc>) -> SagaRecord {
        let now = Utc::now();
        SagaRecord {
            tenant: tenant.clone(),
            transaction_id: TransactionId::new(),
            saga_type: "inventory_transaction".to_string(),
            initiated_by: "test".to_string(),
            status: SagaStatus::Active,
            data: serde_json::json!({"steps": []}),
            version: Version::initial(),
            created_at: now,
            updated_at: now,
            timeout_at,
        }
    }

    fn tenant() -> Tenant {
        Tenant::new(TenantId::new(), "GMS", 83, 1)
    }

    #[tokio::test]
    async fn test_insert_stores_version_one() {
        let store = InMemorySagaStore::new();
        let record = make_record(&tenant(), Utc::now() + Duration::minutes(5));

        let version = store.put(&record).await.unwrap();
        assert_eq!(version, Version::first());

        let loaded = store
            .get(record.tenant.id, record.transaction_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.version, Version::first());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let store = InMemorySagaStore::new();
        let record = make_record(&tenant(), Utc::now() + Duration::minutes(5));

        store.put(&record).await.unwrap();
        let err = store.put(&record).await.unwrap_err();
        assert!(err.is_version_conflict());
    }

    #[tokio::test]
    async fn test_update_with_stale_version_conflicts() {
        let store = InMemorySagaStore::new();
        let mut record = make_record(&tenant(), Utc::now() + Duration::minutes(5));
        record.version = store.put(&record).await.unwrap();

        let stale = record.clone();
        record.status = SagaStatus::Compensating;
        assert_eq!(store.put(&record).await.unwrap(), Version::new(2));

        let err = store.put(&stale).await.unwrap_err();
        assert!(matches!(
            err,
            SagaStoreError::VersionConflict { expected, .. } if expected == Version::first()
        ));
    }

    #[tokio::test]
    async fn test_get_is_tenant_scoped() {
        let store = InMemorySagaStore::new();
        let record = make_record(&tenant(), Utc::now() + Duration::minutes(5));
        store.put(&record).await.unwrap();

        let other = TenantId::new();
        assert!(store.get(other, record.transaction_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_terminal_sagas_excluded_from_active_queries() {
        let store = InMemorySagaStore::new();
        let tenant = tenant();
        let done = make_record(&tenant, Utc::now() + Duration::minutes(5));
        let live = make_record(&tenant, Utc::now() + Duration::minutes(5));
        store.put(&done).await.unwrap();
        store.put(&live).await.unwrap();

        store
            .mark_completed(tenant.id, done.transaction_id)
            .await
            .unwrap();

        let all = store.get_all(tenant.id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].transaction_id, live.transaction_id);
        assert_eq!(store.get_all_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_claim_timed_out_pushes_deadline() {
        let store = InMemorySagaStore::new();
        let now = Utc::now();
        let expired = make_record(&tenant(), now - Duration::seconds(1));
        let fresh = make_record(&tenant(), now + Duration::minutes(5));
        store.put(&expired).await.unwrap();
        store.put(&fresh).await.unwrap();

        let claimed = store
            .claim_timed_out(now, Duration::seconds(30), 10)
            .await
            .unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].transaction_id, expired.transaction_id);
        assert_eq!(claimed[0].version, Version::new(2));

        let again = store
            .claim_timed_out(now, Duration::seconds(30), 10)
            .await
            .unwrap();
        assert!(again.is_empty());
    }

    #[tokio::test]
    async fn test_mark_unknown_saga_not_found() {
        let store = InMemorySagaStore::new();
        let err = store
            .mark_failed(TenantId::new(), TransactionId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SagaStoreError::NotFound(_)));
    }
}
