use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{CharacterId, TenantId};
use tokio::sync::RwLock;

use crate::{QuestRepository, QuestStatus, Result};

type Key = (TenantId, CharacterId, u32);

/// In-memory quest repository.
#[derive(Clone, Default)]
pub struct InMemoryQuestRepository {
    statuses: Arc<RwLock<HashMap<Key, QuestStatus>>>,
}

impl InMemoryQuestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestRepository for InMemoryQuestRepository {
    async fn get(
        &self,
        tenant_id: TenantId,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<Option<QuestStatus>> {
        Ok(self
            .statuses
            .read()
            .await
            .get(&(tenant_id, character_id, quest_id))
            .cloned())
    }

    async fn get_all(&self, tenant_id: TenantId, character_id: CharacterId) -> Result<Vec<QuestStatus>> {
        let mut statuses: Vec<QuestStatus> = self
            .statuses
            .read()
            .await
            .iter()
            .filter(|((t, c, _), _)| *t == tenant_id && *c == character_id)
            .map(|(_, status)| status.clone())
            .collect();
        statuses.sort_by_key(|s| s.quest_id);
        Ok(statuses)
    }

    async fn put(&self, tenant_id: TenantId, status: QuestStatus) -> Result<()> {
        self.statuses
            .write()
            .await
            .insert((tenant_id, status.character_id, status.quest_id), status);
        Ok(())
    }

    async fn delete_by_character(&self, tenant_id: TenantId, character_id: CharacterId) -> Result<()> {
        self.statuses
            .write()
            .await
            .retain(|(t, c, _), _| !(*t == tenant_id && *c == character_id));
        Ok(())
    }
}
