use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{TenantId, TransactionId};

use crate::{Result, SagaRecord, Version};

/// Core trait for saga store implementations.
///
/// All writes are optimistic: the record's `version` must equal the stored
/// version or the write fails with `VersionConflict`. All implementations
/// must be thread-safe (Send + Sync).
#[async_trait]
pub trait SagaStore: Send + Sync {
    /// Inserts a new saga (`version` is initial) or updates an existing one.
    ///
    /// Inserts store version 1. Updates succeed only when the stored version
    /// equals `record.version` and store `record.version + 1`. Returns the
    /// version now stored.
    async fn put(&self, record: &SagaRecord) -> Result<Version>;

    /// Loads a saga by transaction id.
    async fn get(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<Option<SagaRecord>>;

    /// Returns the Active and Compensating sagas of one tenant.
    async fn get_all(&self, tenant_id: TenantId) -> Result<Vec<SagaRecord>>;

    /// Returns the Active and Compensating sagas of every tenant.
    async fn get_all_active(&self) -> Result<Vec<SagaRecord>>;

    /// Claims up to `limit` Active sagas whose deadline is before `now`.
    ///
    /// Claimed rows get their deadline pushed to `now + lease` so that
    /// concurrent sweepers skip them. Returned records carry the new version.
    async fn claim_timed_out(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: i64,
    ) -> Result<Vec<SagaRecord>>;

    /// Marks a saga Completed.
    async fn mark_completed(&self, tenant_id: TenantId, transaction_id: TransactionId)
    -> Result<()>;

    /// Marks a saga Failed.
    async fn mark_failed(&self, tenant_id: TenantId, transaction_id: TransactionId) -> Result<()>;
}

#[async_trait]
impl<S: SagaStore + ?Sized> SagaStore for std::sync::Arc<S> {
    async fn put(&self, record: &SagaRecord) -> Result<Version> {
        (**self).put(record).await
    }

    async fn get(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<Option<SagaRecord>> {
        (**self).get(tenant_id, transaction_id).await
    }

    async fn get_all(&self, tenant_id: TenantId) -> Result<Vec<SagaRecord>> {
        (**self).get_all(tenant_id).await
    }

    async fn get_all_active(&self) -> Result<Vec<SagaRecord>> {
        (**self).get_all_active().await
    }

    async fn claim_timed_out(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: i64,
    ) -> Result<Vec<SagaRecord>> {
        (**self).claim_timed_out(now, lease, limit).await
    }

    async fn mark_completed(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<()> {
        (**self).mark_completed(tenant_id, transaction_id).await
    }

    async fn mark_failed(&self, tenant_id: TenantId, transaction_id: TransactionId) -> Result<()> {
        (**self).mark_failed(tenant_id, transaction_id).await
    }
}
