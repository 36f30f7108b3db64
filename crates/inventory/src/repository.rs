use async_trait::async_trait;
use common::TenantId;

use crate::{Asset, AssetReference, Compartment, CompartmentKey, Result};

/// One write in an inventory transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Inserts the asset or updates it in place (slot and quantity included).
    PutAsset { key: CompartmentKey, asset: Asset },
    DeleteAsset { key: CompartmentKey, asset_id: u32 },
    PutReference(AssetReference),
    DeleteReference(u32),
}

/// Persistence for compartments and asset references.
///
/// `commit` applies a change set atomically: either every change is visible
/// afterwards or none is.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// Loads a compartment. A compartment never written to is returned empty
    /// with its recorded or default capacity.
    async fn load(&self, tenant_id: TenantId, key: CompartmentKey) -> Result<Compartment>;

    async fn reference(
        &self,
        tenant_id: TenantId,
        reference_id: u32,
    ) -> Result<Option<AssetReference>>;

    /// Allocates an id for a new asset or reference.
    async fn next_id(&self) -> Result<u32>;

    async fn set_capacity(
        &self,
        tenant_id: TenantId,
        key: CompartmentKey,
        capacity: u16,
    ) -> Result<()>;

    async fn commit(&self, tenant_id: TenantId, changes: Vec<Change>) -> Result<()>;
}

#[async_trait]
impl<R: InventoryRepository + ?Sized> InventoryRepository for std::sync::Arc<R> {
    async fn load(&self, tenant_id: TenantId, key: CompartmentKey) -> Result<Compartment> {
        (**self).load(tenant_id, key).await
    }

    async fn reference(
        &self,
        tenant_id: TenantId,
        reference_id: u32,
    ) -> Result<Option<AssetReference>> {
        (**self).reference(tenant_id, reference_id).await
    }

    async fn next_id(&self) -> Result<u32> {
        (**self).next_id().await
    }

    async fn set_capacity(
        &self,
        tenant_id: TenantId,
        key: CompartmentKey,
        capacity: u16,
    ) -> Result<()> {
        (**self).set_capacity(tenant_id, key, capacity).await
    }

    async fn commit(&self, tenant_id: TenantId, changes: Vec<Change>) -> Result<()> {
        (**self).commit(tenant_id, changes).await
    }
}
