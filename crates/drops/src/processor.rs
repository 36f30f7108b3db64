use std::sync::Arc;

use bus::{Buffer, Publisher, Topic};
use common::{CharacterId, Field, Origin, Tenant};

use crate::{Drop, DropBuilder, DropError, DropRegistry, DropStatusEvent, Result};

/// Drop operations plus their status events.
///
/// Events are staged in a [`Buffer`] and published only once the registry
/// change has succeeded.
pub struct DropProcessor<R, P> {
    registry: Arc<R>,
    publisher: P,
}

impl<R, P> DropProcessor<R, P>
where
    R: DropRegistry,
    P: Publisher,
{
    pub fn new(registry: Arc<R>, publisher: P) -> Self {
        Self {
            registry,
            publisher,
        }
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    async fn emit(&self, tenant: &Tenant, event: DropStatusEvent) -> Result<()> {
        let mut buffer = Buffer::new();
        buffer.put(Topic::EventDropStatus, event.drop_id, tenant, &event)?;
        buffer.emit(&self.publisher).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, tenant, origin, builder), fields(tenant_id = %tenant.id))]
    pub async fn spawn(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        builder: DropBuilder,
    ) -> Result<Drop> {
        let origin = origin.into();
        let drop = self.registry.create_drop(tenant, builder).await?;
        metrics::counter!("drops_created_total").increment(1);
        tracing::debug!(
            transaction_id = %origin.transaction_id,
            drop_id = drop.id(),
            field = %drop.field(),
            "drop spawned"
        );
        self.emit(
            tenant,
            DropStatusEvent::created(origin.transaction_id, &drop).correlated(origin.correlation_id),
        )
        .await?;
        Ok(drop)
    }

    /// Spawns a drop a character threw on the ground; only they own it.
    pub async fn spawn_for_character(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        builder: DropBuilder,
    ) -> Result<Drop> {
        let builder = builder
            .owner(character_id, 0)
            .dropper(character_id, 0, 0)
            .player_drop(true);
        self.spawn(tenant, origin, builder).await
    }

    /// Reserves a drop; a refused reservation publishes `RESERVATION_FAILURE`
    /// and returns the refusal.
    #[tracing::instrument(skip(self, tenant, origin, field), fields(tenant_id = %tenant.id))]
    pub async fn reserve(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        field: Field,
        drop_id: u32,
        character_id: CharacterId,
        pet_slot: i8,
    ) -> Result<Drop> {
        let origin = origin.into();
        match self
            .registry
            .reserve_drop(tenant.id, drop_id, character_id, pet_slot)
            .await
        {
            Ok(drop) => {
                self.emit(
                    tenant,
                    DropStatusEvent::reserved(origin.transaction_id, &drop, character_id)
                        .correlated(origin.correlation_id),
                )
                .await?;
                Ok(drop)
            }
            Err(e @ (DropError::ReservedByAnother { .. } | DropError::NotFound(_))) => {
                tracing::debug!(error = %e, "drop reservation refused");
                self.emit(
                    tenant,
                    DropStatusEvent::reservation_failure(
                        origin.transaction_id,
                        field,
                        drop_id,
                        character_id,
                    )
                    .correlated(origin.correlation_id),
                )
                .await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn cancel_reservation(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        field: Field,
        drop_id: u32,
        character_id: CharacterId,
    ) -> Result<()> {
        let origin = origin.into();
        self.registry
            .cancel_drop_reservation(tenant.id, drop_id, character_id)
            .await?;
        self.emit(
            tenant,
            DropStatusEvent::reservation_cancelled(
                origin.transaction_id,
                field,
                drop_id,
                character_id,
            )
            .correlated(origin.correlation_id),
        )
        .await
    }

    /// Removes a drop picked up by `character_id`.
    #[tracing::instrument(skip(self, tenant, origin), fields(tenant_id = %tenant.id))]
    pub async fn gather(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        drop_id: u32,
        character_id: CharacterId,
    ) -> Result<Drop> {
        let origin = origin.into();
        let drop = self
            .registry
            .remove_drop(tenant.id, drop_id)
            .await?
            .ok_or(DropError::NotFound(drop_id))?;
        self.emit(
            tenant,
            DropStatusEvent::picked_up(origin.transaction_id, &drop, character_id)
                .correlated(origin.correlation_id),
        )
        .await?;
        Ok(drop)
    }

    /// Removes a drop used up in place (pet auto-loot, scripted cleanup).
    /// Consuming a drop that is already gone is a no-op.
    pub async fn consume(&self, tenant: &Tenant, drop_id: u32) -> Result<()> {
        if let Some(drop) = self.registry.remove_drop(tenant.id, drop_id).await? {
            self.emit(tenant, DropStatusEvent::consumed(&drop)).await?;
        }
        Ok(())
    }

    /// Removes an expired drop. Returns false when something else removed it first.
    pub async fn expire(&self, tenant: &Tenant, drop: &Drop) -> Result<bool> {
        let Some(removed) = self.registry.remove_drop(tenant.id, drop.id()).await? else {
            return Ok(false);
        };
        metrics::counter!("drops_expired_total").increment(1);
        self.emit(tenant, DropStatusEvent::expired(&removed)).await?;
        Ok(true)
    }

    pub async fn get_by_id(&self, tenant: &Tenant, drop_id: u32) -> Result<Drop> {
        self.registry.get_drop(tenant.id, drop_id).await
    }

    pub async fn get_for_map(&self, tenant: &Tenant, field: &Field) -> Result<Vec<Drop>> {
        self.registry.get_drops_for_map(tenant.id, field).await
    }
}
