use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use common::TenantId;
use tokio::sync::RwLock;

use crate::{
    Asset, AssetReference, Change, Compartment, CompartmentKey, InventoryError,
    InventoryRepository, Result,
};

#[derive(Debug, Default)]
struct State {
    assets: HashMap<(TenantId, CompartmentKey), BTreeMap<u32, Asset>>,
    references: HashMap<(TenantId, u32), AssetReference>,
    capacities: HashMap<(TenantId, CompartmentKey), u16>,
}

/// In-memory inventory repository for tests and single-process use.
#[derive(Clone)]
pub struct InMemoryInventoryRepository {
    state: Arc<RwLock<State>>,
    next_id: Arc<AtomicU32>,
    fail_on_commit: Arc<AtomicBool>,
}

impl Default for InMemoryInventoryRepository {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            next_id: Arc::new(AtomicU32::new(1)),
            fail_on_commit: Arc::default(),
        }
    }
}

impl InMemoryInventoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following commit fail, leaving state untouched.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    pub async fn reference_count(&self) -> usize {
        self.state.read().await.references.len()
    }
}

#[async_trait]
impl InventoryRepository for InMemoryInventoryRepository {
    async fn load(&self, tenant_id: TenantId, key: CompartmentKey) -> Result<Compartment> {
        let state = self.state.read().await;
        let capacity = state
            .capacities
            .get(&(tenant_id, key))
            .copied()
            .unwrap_or_else(|| key.kind.default_capacity());
        let assets = state
            .assets
            .get(&(tenant_id, key))
            .map(|assets| assets.values().cloned().collect())
            .unwrap_or_default();
        Ok(Compartment::with_assets(key, capacity, assets))
    }

    async fn reference(
        &self,
        tenant_id: TenantId,
        reference_id: u32,
    ) -> Result<Option<AssetReference>> {
        Ok(self
            .state
            .read()
            .await
            .references
            .get(&(tenant_id, reference_id))
            .cloned())
    }

    async fn next_id(&self) -> Result<u32> {
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn set_capacity(
        &self,
        tenant_id: TenantId,
        key: CompartmentKey,
        capacity: u16,
    ) -> Result<()> {
        self.state
            .write()
            .await
            .capacities
            .insert((tenant_id, key), capacity);
        Ok(())
    }

    async fn commit(&self, tenant_id: TenantId, changes: Vec<Change>) -> Result<()> {
        if self.fail_on_commit.load(Ordering::SeqCst) {
            return Err(InventoryError::Corrupt("commit rejected".to_string()));
        }
        let mut state = self.state.write().await;
        for change in changes {
            match change {
                Change::PutAsset { key, asset } => {
                    state
                        .assets
                        .entry((tenant_id, key))
                        .or_default()
                        .insert(asset.id, asset);
                }
                Change::DeleteAsset { key, asset_id } => {
                    if let Some(assets) = state.assets.get_mut(&(tenant_id, key)) {
                        assets.remove(&asset_id);
                    }
                }
                Change::PutReference(reference) => {
                    state.references.insert((tenant_id, reference.id), reference);
                }
                Change::DeleteReference(id) => {
                    state.references.remove(&(tenant_id, id));
                }
            }
        }
        Ok(())
    }
}
