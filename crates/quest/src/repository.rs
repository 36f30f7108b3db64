use async_trait::async_trait;
use common::{CharacterId, TenantId};

use crate::{QuestStatus, Result};

/// Persistence for quest status records.
#[async_trait]
pub trait QuestRepository: Send + Sync {
    async fn get(
        &self,
        tenant_id: TenantId,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<Option<QuestStatus>>;

    async fn get_all(&self, tenant_id: TenantId, character_id: CharacterId) -> Result<Vec<QuestStatus>>;

    /// Inserts or replaces the record.
    async fn put(&self, tenant_id: TenantId, status: QuestStatus) -> Result<()>;

    async fn delete_by_character(&self, tenant_id: TenantId, character_id: CharacterId) -> Result<()>;
}

#[async_trait]
impl<R: QuestRepository + ?Sized> QuestRepository for std::sync::Arc<R> {
    async fn get(
        &self,
        tenant_id: TenantId,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<Option<QuestStatus>> {
        (**self).get(tenant_id, character_id, quest_id).await
    }

    async fn get_all(&self, tenant_id: TenantId, character_id: CharacterId) -> Result<Vec<QuestStatus>> {
        (**self).get_all(tenant_id, character_id).await
    }

    async fn put(&self, tenant_id: TenantId, status: QuestStatus) -> Result<()> {
        (**self).put(tenant_id, status).await
    }

    async fn delete_by_character(&self, tenant_id: TenantId, character_id: CharacterId) -> Result<()> {
        (**self).delete_by_character(tenant_id, character_id).await
    }
}
