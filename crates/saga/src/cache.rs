//! Tenant-scoped cache of live sagas.

use std::collections::HashMap;
use std::sync::Arc;

use common::{TenantId, TransactionId};
use tokio::sync::RwLock;

use crate::Saga;

/// Write-through cache in front of the saga store.
///
/// The store stays authoritative: a miss falls back to it, and a saga
/// that ends is evicted.
#[derive(Clone, Default)]
pub struct SagaCache {
    sagas: Arc<RwLock<HashMap<TenantId, HashMap<TransactionId, Saga>>>>,
}

impl SagaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, tenant_id: TenantId, transaction_id: TransactionId) -> Option<Saga> {
        self.sagas
            .read()
            .await
            .get(&tenant_id)
            .and_then(|sagas| sagas.get(&transaction_id))
            .cloned()
    }

    /// Every cached saga of one tenant.
    pub async fn get_all(&self, tenant_id: TenantId) -> Vec<Saga> {
        self.sagas
            .read()
            .await
            .get(&tenant_id)
            .map(|sagas| sagas.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn put(&self, tenant_id: TenantId, saga: Saga) {
        self.sagas
            .write()
            .await
            .entry(tenant_id)
            .or_default()
            .insert(saga.transaction_id, saga);
    }

    pub async fn remove(&self, tenant_id: TenantId, transaction_id: TransactionId) -> bool {
        let mut sagas = self.sagas.write().await;
        let Some(tenant_sagas) = sagas.get_mut(&tenant_id) else {
            return false;
        };
        let removed = tenant_sagas.remove(&transaction_id).is_some();
        if tenant_sagas.is_empty() {
            sagas.remove(&tenant_id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sagas.read().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, PortalPayload};
    use crate::saga::SagaType;

    fn saga() -> Saga {
        Saga::builder(SagaType::InventoryTransaction, "test")
            .step(
                "block",
                Action::BlockPortal(PortalPayload {
                    character_id: 1,
                    map_id: 100000000,
                    portal_id: 2,
                }),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let cache = SagaCache::new();
        let a = TenantId::new();
        let b = TenantId::new();
        let saga = saga();

        cache.put(a, saga.clone()).await;
        assert_eq!(cache.get(a, saga.transaction_id).await, Some(saga.clone()));
        assert_eq!(cache.get(b, saga.transaction_id).await, None);
        assert!(cache.get_all(b).await.is_empty());
        assert_eq!(cache.get_all(a).await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_evicts() {
        let cache = SagaCache::new();
        let tenant = TenantId::new();
        let saga = saga();

        cache.put(tenant, saga.clone()).await;
        assert!(cache.remove(tenant, saga.transaction_id).await);
        assert!(!cache.remove(tenant, saga.transaction_id).await);
        assert!(cache.is_empty().await);
    }
}
