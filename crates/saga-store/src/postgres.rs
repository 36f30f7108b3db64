use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{Tenant, TenantId, TransactionId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{Result, SagaRecord, SagaStatus, SagaStore, SagaStoreError, Version};

const SELECT_COLUMNS: &str = "transaction_id, tenant_id, tenant_region, tenant_major_version, \
     tenant_minor_version, saga_type, initiated_by, status, saga_data, version, created_at, \
     updated_at, timeout_at";

/// PostgreSQL-backed saga store implementation.
#[derive(Clone)]
pub struct PostgresSagaStore {
    pool: PgPool,
}

impl PostgresSagaStore {
    /// Creates a new PostgreSQL saga store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<SagaRecord> {
        let status: String = row.try_get("status")?;
        let status = SagaStatus::parse(&status)
            .ok_or_else(|| SagaStoreError::Corrupt(format!("unknown status {status}")))?;
        let major: i32 = row.try_get("tenant_major_version")?;
        let minor: i32 = row.try_get("tenant_minor_version")?;

        Ok(SagaRecord {
            tenant: Tenant::new(
                TenantId::from_uuid(row.try_get::<Uuid, _>("tenant_id")?),
                row.try_get::<String, _>("tenant_region")?,
                u16::try_from(major)
                    .map_err(|_| SagaStoreError::Corrupt(format!("major version {major}")))?,
                u16::try_from(minor)
                    .map_err(|_| SagaStoreError::Corrupt(format!("minor version {minor}")))?,
            ),
            transaction_id: TransactionId::from_uuid(row.try_get::<Uuid, _>("transaction_id")?),
            saga_type: row.try_get("saga_type")?,
            initiated_by: row.try_get("initiated_by")?,
            status,
            data: row.try_get("saga_data")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            timeout_at: row.try_get("timeout_at")?,
        })
    }

    async fn set_status(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
        status: SagaStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sagas
            SET status = $1, version = version + 1, updated_at = NOW()
            WHERE tenant_id = $2 AND transaction_id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(tenant_id.as_uuid())
        .bind(transaction_id.as_uuid())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SagaStoreError::NotFound(transaction_id));
        }
        Ok(())
    }
}

#[async_trait]
impl SagaStore for PostgresSagaStore {
    #[tracing::instrument(skip(self, record), fields(transaction_id = %record.transaction_id, version = %record.version))]
    async fn put(&self, record: &SagaRecord) -> Result<Version> {
        if record.version.is_initial() {
            sqlx::query(
                r#"
                INSERT INTO sagas (transaction_id, tenant_id, tenant_region, tenant_major_version,
                                   tenant_minor_version, saga_type, initiated_by, status, saga_data,
                                   version, created_at, updated_at, timeout_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 1, $10, $11, $12)
                "#,
            )
            .bind(record.transaction_id.as_uuid())
            .bind(record.tenant.id.as_uuid())
            .bind(&record.tenant.region)
            .bind(i32::from(record.tenant.major_version))
            .bind(i32::from(record.tenant.minor_version))
            .bind(&record.saga_type)
            .bind(&record.initiated_by)
            .bind(record.status.as_str())
            .bind(&record.data)
            .bind(record.created_at)
            .bind(record.updated_at)
            .bind(record.timeout_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                // A second insert of the same transaction loses the race
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("sagas_pkey")
                {
                    return SagaStoreError::VersionConflict {
                        transaction_id: record.transaction_id,
                        expected: record.version,
                    };
                }
                SagaStoreError::Database(e)
            })?;
            return Ok(Version::first());
        }

        let result = sqlx::query(
            r#"
            UPDATE sagas
            SET status = $1, saga_data = $2, version = version + 1, updated_at = NOW(),
                timeout_at = $3
            WHERE transaction_id = $4 AND tenant_id = $5 AND version = $6
            "#,
        )
        .bind(record.status.as_str())
        .bind(&record.data)
        .bind(record.timeout_at)
        .bind(record.transaction_id.as_uuid())
        .bind(record.tenant.id.as_uuid())
        .bind(record.version.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            metrics::counter!("saga_store_version_conflicts_total").increment(1);
            return Err(SagaStoreError::VersionConflict {
                transaction_id: record.transaction_id,
                expected: record.version,
            });
        }
        Ok(record.version.next())
    }

    async fn get(
        &self,
        tenant_id: TenantId,
        transaction_id: TransactionId,
    ) -> Result<Option<SagaRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sagas WHERE tenant_id = $1 AND transaction_id = $2"
        ))
        .bind(tenant_id.as_uuid())
        .bind(transaction_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn get_all(&self, tenant_id: TenantId) -> Result<Vec<SagaRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sagas \
             WHERE tenant_id = $1 AND status IN ('active', 'compensating') \
             ORDER BY created_at ASC"
        ))
        .bind(tenant_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    async fn get_all_active(&self) -> Result<Vec<SagaRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM sagas \
             WHERE status IN ('active', 'compensating') \
             ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
    }

    #[tracing::instrument(skip(self))]
    async fn claim_timed_out(
        &self,
        now: DateTime<Utc>,
        lease: Duration,
        limit: i64,
    ) -> Result<Vec<SagaRecord>> {
        // Row locks are held only for this statement; pushing the deadline
        // forward is what keeps other sweepers away after commit.
        let rows = sqlx::query(&format!(
            r#"
            UPDATE sagas
            SET timeout_at = $1, version = version + 1, updated_at = NOW()
            WHERE transaction_id IN (
                SELECT transaction_id FROM sagas
                WHERE status = 'active' AND timeout_at < $2
                ORDER BY timeout_at ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(now + lease)
        .bind(now)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_record).collect()
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
