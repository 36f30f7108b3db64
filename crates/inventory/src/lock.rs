use std::sync::Arc;

use common::TenantId;
use dashmap::DashMap;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::CompartmentKey;

/// Lazily created reader-writer lock per compartment.
///
/// Locks are process-local. Cross-process ordering comes from the bus
/// routing every command for an owner to the same partition.
#[derive(Clone, Default)]
pub struct LockRegistry {
    locks: Arc<DashMap<(TenantId, CompartmentKey), Arc<RwLock<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, tenant_id: TenantId, key: CompartmentKey) -> Arc<RwLock<()>> {
        self.locks
            .entry((tenant_id, key))
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Exclusive lock held for the duration of a mutation.
    pub async fn write(&self, tenant_id: TenantId, key: CompartmentKey) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(tenant_id, key).write_owned().await
    }

    /// Shared lock for reads that need a consistent snapshot.
    pub async fn read(&self, tenant_id: TenantId, key: CompartmentKey) -> OwnedRwLockReadGuard<()> {
        self.lock_for(tenant_id, key).read_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
