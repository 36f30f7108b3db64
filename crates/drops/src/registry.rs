use async_trait::async_trait;
use common::{CharacterId, Field, Tenant, TenantId};

use crate::{Drop, DropBuilder, Result};

/// Inclusive range drop ids are allocated from.
///
/// The counter is shared by all tenants and wraps back to `min` once `max`
/// has been handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub min: u32,
    pub max: u32,
}

impl IdRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// The id following `current`, wrapping at the top of the range.
    pub fn next_after(&self, current: u32) -> u32 {
        if current < self.min || current >= self.max {
            self.min
        } else {
            current + 1
        }
    }
}

impl Default for IdRange {
    fn default() -> Self {
        Self {
            min: 1_000_000_001,
            max: 2_000_000_000,
        }
    }
}

/// Storage of live drops.
///
/// Reservation is the only contended operation: concurrent reservations of
/// the same drop must resolve to exactly one holder.
#[async_trait]
pub trait DropRegistry: Send + Sync {
    /// Allocates an id and stores the drop as available.
    async fn create_drop(&self, tenant: &Tenant, builder: DropBuilder) -> Result<Drop>;

    async fn get_drop(&self, tenant_id: TenantId, drop_id: u32) -> Result<Drop>;

    /// Reserves an available drop for `character_id`.
    ///
    /// Re-reserving for the current holder succeeds and returns the drop
    /// unchanged; any other holder gets `ReservedByAnother`.
    async fn reserve_drop(
        &self,
        tenant_id: TenantId,
        drop_id: u32,
        character_id: CharacterId,
        pet_slot: i8,
    ) -> Result<Drop>;

    /// Releases the reservation if `character_id` holds it; otherwise a no-op.
    async fn cancel_drop_reservation(
        &self,
        tenant_id: TenantId,
        drop_id: u32,
        character_id: CharacterId,
    ) -> Result<()>;

    /// Removes and returns the drop. Removing an unknown drop returns `None`.
    async fn remove_drop(&self, tenant_id: TenantId, drop_id: u32) -> Result<Option<Drop>>;

    async fn get_drops_for_map(&self, tenant_id: TenantId, field: &Field) -> Result<Vec<Drop>>;

    /// Every live drop across all tenants, used by the expiration task.
    async fn get_all_drops(&self) -> Result<Vec<(Tenant, Drop)>>;
}

#[async_trait]
impl<R: DropRegistry + ?Sized> DropRegistry for std::sync::Arc<R> {
    async fn create_drop(&self, tenant: &Tenant, builder: DropBuilder) -> Result<Drop> {
        (**self).create_drop(tenant, builder).await
    }

    async fn get_drop(&self, tenant_id: TenantId, drop_id: u32) -> Result<Drop> {
        (**self).get_drop(tenant_id, drop_id).await
    }

    async fn reserve_drop(
        &self,
        tenant_id: TenantId,
        drop_id: u32,
        character_id: CharacterId,
        pet_slot: i8,
    ) -> Result<Drop> {
        (**self)
            .reserve_drop(tenant_id, drop_id, character_id, pet_slot)
            .await
    }

    async fn cancel_drop_reservation(
        &self,
        tenant_id: TenantId,
        drop_id: u32,
        character_id: CharacterId,
    ) -> Result<()> {
        (**self)
            .cancel_drop_reservation(tenant_id, drop_id, character_id)
            .await
    }

    async fn remove_drop(&self, tenant_id: TenantId, drop_id: u32) -> Result<Option<Drop>> {
        (**self).remove_drop(tenant_id, drop_id).await
    }

    async fn get_drops_for_map(&self, tenant_id: TenantId, field: &Field) -> Result<Vec<Drop>> {
        (**self).get_drops_for_map(tenant_id, field).await
    }

    async fn get_all_drops(&self) -> Result<Vec<(Tenant, Drop)>> {
        (**self).get_all_drops().await
    }
}
