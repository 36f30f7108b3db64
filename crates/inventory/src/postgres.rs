use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EquipmentStats, TenantId};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow, types::Json};

use crate::{
    Asset, AssetReference, Change, Compartment, CompartmentKey, InventoryError,
    InventoryRepository, Result,
};

/// PostgreSQL-backed inventory repository.
///
/// Assets are keyed by `(tenant_id, id)`; the per-compartment slot
/// uniqueness constraint is deferred so a swap can rewrite both rows inside
/// one transaction.
#[derive(Clone)]
pub struct PostgresInventoryRepository {
    pool: PgPool,
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| InventoryError::Corrupt(format!("{column} {value}")))
}

impl PostgresInventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_asset(row: PgRow) -> Result<Asset> {
        let slot: i16 = row.try_get("slot")?;
        let expiration: Option<DateTime<Utc>> = row.try_get("expiration")?;
        Ok(Asset {
            id: to_u32(row.try_get("id")?, "asset id")?,
            slot,
            template_id: to_u32(row.try_get("template_id")?, "template id")?,
            quantity: to_u32(row.try_get("quantity")?, "quantity")?,
            expiration,
            reference_id: to_u32(row.try_get("reference_id")?, "reference id")?,
        })
    }

    fn row_to_reference(row: PgRow) -> Result<AssetReference> {
        let stats: Option<Json<EquipmentStats>> = row.try_get("stats")?;
        let count: i32 = row.try_get("reference_count")?;
        Ok(AssetReference {
            id: to_u32(row.try_get("id")?, "reference id")?,
            template_id: to_u32(row.try_get("template_id")?, "template id")?,
            stats: stats.map(|Json(stats)| stats),
            reference_count: u32::try_from(count)
                .map_err(|_| InventoryError::Corrupt(format!("reference count {count}")))?,
        })
    }

    async fn apply(
        tx: &mut Transaction<'_, Postgres>,
        tenant_id: TenantId,
        change: Change,
    ) -> Result<()> {
        match change {
            Change::PutAsset { key, asset } => {
                sqlx::query(
                    r#"
                    INSERT INTO assets (tenant_id, id, owner_id, compartment, inventory_type,
                                        slot, template_id, quantity, expiration, reference_id)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    ON CONFLICT (tenant_id, id) DO UPDATE
                    SET owner_id = EXCLUDED.owner_id,
                        compartment = EXCLUDED.compartment,
                        inventory_type = EXCLUDED.inventory_type,
                        slot = EXCLUDED.slot,
                        quantity = EXCLUDED.quantity,
                        expiration = EXCLUDED.expiration
                    "#,
                )
                .bind(tenant_id.as_uuid())
                .bind(i64::from(asset.id))
                .bind(i64::from(key.owner_id))
                .bind(key.kind.as_name())
                .bind(key.kind.inventory_type().map(|t| i16::from(t.as_u8())))
                .bind(asset.slot)
                .bind(i64::from(asset.template_id))
                .bind(i64::from(asset.quantity))
                .bind(asset.expiration)
                .bind(i64::from(asset.reference_id))
                .execute(&mut **tx)
                .await?;
            }
            Change::DeleteAsset { key, asset_id } => {
                sqlx::query(
                    r#"
                    DELETE FROM assets
                    WHERE tenant_id = $1 AND id = $2 AND owner_id = $3 AND compartment = $4
                    "#,
                )
                .bind(tenant_id.as_uuid())
                .bind(i64::from(asset_id))
                .bind(i64::from(key.owner_id))
                .bind(key.kind.as_name())
                .execute(&mut **tx)
                .await?;
            }
            Change::PutReference(reference) => {
                let count = i32::try_from(reference.reference_count).map_err(|_| {
                    InventoryError::Corrupt(format!(
                        "reference count {}",
                        reference.reference_count
                    ))
                })?;
                sqlx::query(
                    r#"
                    INSERT INTO asset_references (tenant_id, id, template_id, stats, reference_count)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (tenant_id, id) DO UPDATE
                    SET stats = EXCLUDED.stats, reference_count = EXCLUDED.reference_count
                    "#,
                )
                .bind(tenant_id.as_uuid())
                .bind(i64::from(reference.id))
                .bind(i64::from(reference.template_id))
                .bind(reference.stats.map(Json))
                .bind(count)
                .execute(&mut **tx)
                .await?;
            }
            Change::DeleteReference(id) => {
                sqlx::query("DELETE FROM asset_references WHERE tenant_id = $1 AND id = $2")
                    .bind(tenant_id.as_uuid())
                    .bind(i64::from(id))
                    .execute(&mut **tx)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl InventoryRepository for PostgresInventoryRepository {
    async fn load(&self, tenant_id: TenantId, key: CompartmentKey) -> Result<Compartment> {
        let name = key.kind.as_name();
        let capacity: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT capacity FROM compartments
            WHERE tenant_id = $1 AND owner_id = $2 AND compartment = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(i64::from(key.owner_id))
        .bind(&name)
        .fetch_optional(&self.pool)
        .await?;
        let capacity = match capacity {
            Some(c) => u16::try_from(c)
                .map_err(|_| InventoryError::Corrupt(format!("capacity {c}")))?,
            None => key.kind.default_capacity(),
        };

        let rows = sqlx::query(
            r#"
            SELECT id, slot, template_id, quantity, expiration, reference_id
            FROM assets
            WHERE tenant_id = $1 AND owner_id = $2 AND compartment = $3
            ORDER BY slot ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(i64::from(key.owner_id))
        .bind(&name)
        .fetch_all(&self.pool)
        .await?;

        let assets = rows
            .into_iter()
            .map(Self::row_to_asset)
            .collect::<Result<Vec<_>>>()?;
        Ok(Compartment::with_assets(key, capacity, assets))
    }

    async fn reference(
        &self,
        tenant_id: TenantId,
        reference_id: u32,
    ) -> Result<Option<AssetReference>> {
        let row = sqlx::query(
            r#"
            SELECT id, template_id, stats, reference_count
            FROM asset_references
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(i64::from(reference_id))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_reference).transpose()
    }

    async fn next_id(&self) -> Result<u32> {
        let id: i64 = sqlx::query_scalar("SELECT nextval('asset_id_seq')")
            .fetch_one(&self.pool)
            .await?;
        to_u32(id, "asset id")
    }

    async fn set_capacity(
        &self,
        tenant_id: TenantId,
        key: CompartmentKey,
        capacity: u16,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO compartments (tenant_id, owner_id, compartment, capacity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (tenant_id, owner_id, compartment) DO UPDATE
            SET capacity = EXCLUDED.capacity
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(i64::from(key.owner_id))
        .bind(key.kind.as_name())
        .bind(i32::from(capacity))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, changes), fields(tenant_id = %tenant_id, changes = changes.len()))]
    async fn commit(&self, tenant_id: TenantId, changes: Vec<Change>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for change in changes {
            Self::apply(&mut tx, tenant_id, change).await?;
        }
        tx.commit().await.map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("assets_slot_unique")
            {
                return InventoryError::Corrupt("two assets in one slot".to_string());
            }
            InventoryError::Database(e)
        })?;
        Ok(())
    }
}
