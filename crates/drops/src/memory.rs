use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::{CharacterId, Field, Tenant, TenantId};
use tokio::sync::Mutex;

use crate::{Drop, DropBuilder, DropError, DropRegistry, DropStatus, IdRange, Result};

#[derive(Debug, Default)]
struct State {
    last_id: u32,
    drops: HashMap<(TenantId, u32), (Tenant, Drop)>,
    by_map: HashMap<(TenantId, Field), HashSet<u32>>,
}

impl State {
    fn insert(&mut self, tenant: &Tenant, drop: Drop) {
        let id = drop.id();
        self.remove(tenant.id, id);
        self.by_map
            .entry((tenant.id, *drop.field()))
            .or_default()
            .insert(id);
        self.drops.insert((tenant.id, id), (tenant.clone(), drop));
    }

    fn remove(&mut self, tenant_id: TenantId, drop_id: u32) -> Option<Drop> {
        let (_, drop) = self.drops.remove(&(tenant_id, drop_id))?;
        let key = (tenant_id, *drop.field());
        if let Some(ids) = self.by_map.get_mut(&key) {
            ids.remove(&drop_id);
            if ids.is_empty() {
                self.by_map.remove(&key);
            }
        }
        Some(drop)
    }
}

/// Process-local drop registry.
///
/// A single mutex guards the counter, the records and the per-map index,
/// which makes every operation (reservation included) linearizable.
#[derive(Clone, Default)]
pub struct InMemoryDropRegistry {
    range: IdRange,
    state: Arc<Mutex<State>>,
}

impl InMemoryDropRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_range(range: IdRange) -> Self {
        Self {
            range,
            state: Arc::default(),
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.drops.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.drops.is_empty()
    }
}

#[async_trait]
impl DropRegistry for InMemoryDropRegistry {
    async fn create_drop(&self, tenant: &Tenant, builder: DropBuilder) -> Result<Drop> {
        builder.validate()?;
        let mut state = self.state.lock().await;
        let id = self.range.next_after(state.last_id);
        state.last_id = id;
        let drop = builder.build(id)?;
        state.insert(tenant, drop.clone());
        Ok(drop)
    }

    async fn get_drop(&self, tenant_id: TenantId, drop_id: u32) -> Result<Drop> {
        self.state
            .lock()
            .await
            .drops
            .get(&(tenant_id, drop_id))
            .map(|(_, drop)| drop.clone())
            .ok_or(DropError::NotFound(drop_id))
    }

    async fn reserve_drop(
        &self,
        tenant_id: TenantId,
        drop_id: u32,
        character_id: CharacterId,
        pet_slot: i8,
    ) -> Result<Drop> {
        let mut state = self.state.lock().await;
        let (_, drop) = state
            .drops
            .get_mut(&(tenant_id, drop_id))
            .ok_or(DropError::NotFound(drop_id))?;

        match (drop.status(), drop.reserved_by()) {
            (DropStatus::Available, _) => {
                *drop = drop.reserve(character_id, pet_slot);
                Ok(drop.clone())
            }
            (DropStatus::Reserved, Some(holder)) if holder == character_id => Ok(drop.clone()),
            (DropStatus::Reserved, holder) => Err(DropError::ReservedByAnother {
                drop_id,
                reserved_by: holder.unwrap_or_default(),
            }),
        }
    }

    async fn cancel_drop_reservation(
        &self,
        tenant_id: TenantId,
        drop_id: u32,
        character_id: CharacterId,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        if let Some((_, drop)) = state.drops.get_mut(&(tenant_id, drop_id))
            && drop.is_reserved_by(character_id)
        {
            *drop = drop.cancel_reservation();
        }
        Ok(())
    }

    async fn remove_drop(&self, tenant_id: TenantId, drop_id: u32) -> Result<Option<Drop>> {
        Ok(self.state.lock().await.remove(tenant_id, drop_id))
    }

    async fn get_drops_for_map(&self, tenant_id: TenantId, field: &Field) -> Result<Vec<Drop>> {
        let state = self.state.lock().await;
        let Some(ids) = state.by_map.get(&(tenant_id, *field)) else {
            return Ok(Vec::new());
        };
        let mut drops: Vec<Drop> = ids
            .iter()
            .filter_map(|id| state.drops.get(&(tenant_id, *id)))
            .map(|(_, drop)| drop.clone())
            .collect();
        drops.sort_by_key(Drop::id);
        Ok(drops)
    }

    async fn get_all_drops(&self) -> Result<Vec<(Tenant, Drop)>> {
        Ok(self.state.lock().await.drops.values().cloned().collect())
    }
}
