use std::sync::Arc;

use bus::{Buffer, Publisher, Topic};
use chrono::{DateTime, Utc};
use common::{CharacterId, Origin, Tenant, TenantId};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    QuestDefinition, QuestDefinitionProvider, QuestError, QuestRepository, QuestState,
    QuestStatus, QuestStatusEvent, QuestStatusKind, Result,
};

/// A completed quest and the quest its chain continues with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub quest_id: u32,
    pub next_quest_id: Option<u32>,
}

/// Pending writes and events of one quest operation, applied together.
struct Work {
    origin: Origin,
    statuses: Vec<QuestStatus>,
    events: Vec<QuestStatusEvent>,
}

impl Work {
    fn new(origin: Origin) -> Self {
        Self {
            origin,
            statuses: Vec::new(),
            events: Vec::new(),
        }
    }

    fn record(&mut self, status: QuestStatus, kind: QuestStatusKind) {
        self.events.push(
            QuestStatusEvent::new(self.origin.transaction_id, status.character_id, status.quest_id, kind)
                .correlated(self.origin.correlation_id.clone()),
        );
        self.statuses.retain(|s| s.quest_id != status.quest_id);
        self.statuses.push(status);
    }
}

/// Per-character quest state machine.
///
/// Every operation runs under a per-character mutex and stages its writes;
/// nothing is persisted or published unless the whole operation succeeds.
pub struct QuestEngine<R, P> {
    repository: Arc<R>,
    definitions: Arc<dyn QuestDefinitionProvider>,
    publisher: P,
    locks: Arc<DashMap<(TenantId, CharacterId), Arc<Mutex<()>>>>,
}

impl<R, P> QuestEngine<R, P>
where
    R: QuestRepository,
    P: Publisher,
{
    pub fn new(repository: Arc<R>, definitions: Arc<dyn QuestDefinitionProvider>, publisher: P) -> Self {
        Self {
            repository,
            definitions,
            publisher,
            locks: Arc::default(),
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    async fn lock(&self, tenant_id: TenantId, character_id: CharacterId) -> OwnedMutexGuard<()> {
        self.locks
            .entry((tenant_id, character_id))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
            .lock_owned()
            .await
    }

    fn definition(&self, quest_id: u32) -> Result<QuestDefinition> {
        self.definitions
            .definition(quest_id)
            .ok_or(QuestError::DefinitionNotFound(quest_id))
    }

    async fn current(
        &self,
        tenant: &Tenant,
        work: &Work,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<QuestStatus> {
        if let Some(staged) = work.statuses.iter().find(|s| s.quest_id == quest_id) {
            return Ok(staged.clone());
        }
        Ok(self
            .repository
            .get(tenant.id, character_id, quest_id)
            .await?
            .unwrap_or_else(|| QuestStatus::new(character_id, quest_id)))
    }

    async fn finish(&self, tenant: &Tenant, work: Work) -> Result<()> {
        for status in work.statuses {
            self.repository.put(tenant.id, status).await?;
        }
        let mut buffer = Buffer::new();
        for event in &work.events {
            if matches!(
                event.kind,
                QuestStatusKind::Started | QuestStatusKind::Completed { .. } | QuestStatusKind::Forfeited
            ) {
                metrics::counter!("quest_transitions_total").increment(1);
            }
            buffer.put(Topic::EventQuestStatus, event.character_id, tenant, event)?;
        }
        buffer.emit(&self.publisher).await?;
        Ok(())
    }

    async fn start_in(
        &self,
        tenant: &Tenant,
        work: &mut Work,
        character_id: CharacterId,
        quest_id: u32,
        check_interval: bool,
        now: DateTime<Utc>,
    ) -> Result<QuestStatus> {
        let definition = self.definition(quest_id)?;
        let mut status = self.current(tenant, work, character_id, quest_id).await?;

        match status.state {
            QuestState::Started => return Err(QuestError::AlreadyStarted(quest_id)),
            QuestState::Completed if check_interval => match definition.repeat_interval {
                None => return Err(QuestError::AlreadyCompleted(quest_id)),
                Some(interval) => {
                    if status
                        .completed_at
                        .is_some_and(|completed| completed + interval > now)
                    {
                        return Err(QuestError::IntervalNotElapsed(quest_id));
                    }
                }
            },
            _ => {}
        }

        status.state = QuestState::Started;
        status.started_at = Some(now);
        status.expiration_time = definition.time_limit.map(|limit| now + limit);
        status.progress = definition.initial_progress();
        work.record(status.clone(), QuestStatusKind::Started);
        Ok(status)
    }

    async fn complete_in(
        &self,
        tenant: &Tenant,
        work: &mut Work,
        character_id: CharacterId,
        quest_id: u32,
        now: DateTime<Utc>,
    ) -> Result<Completion> {
        let definition = self.definition(quest_id)?;
        let mut status = self.current(tenant, work, character_id, quest_id).await?;

        match status.state {
            QuestState::Started => {}
            QuestState::Completed => return Err(QuestError::AlreadyCompleted(quest_id)),
            QuestState::NotStarted => return Err(QuestError::NotStarted(quest_id)),
        }
        if status.is_expired(now) {
            return Err(QuestError::Expired(quest_id));
        }

        status.state = QuestState::Completed;
        status.completed_at = Some(now);
        status.expiration_time = None;
        status.completed_count += 1;
        work.record(
            status,
            QuestStatusKind::Completed {
                next_quest_id: definition.next_quest_id,
            },
        );
        Ok(Completion {
            quest_id,
            next_quest_id: definition.next_quest_id,
        })
    }

    async fn auto_complete_in(
        &self,
        tenant: &Tenant,
        work: &mut Work,
        character_id: CharacterId,
        quest_id: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<Completion>> {
        let definition = self.definition(quest_id)?;
        if !definition.auto_complete {
            return Ok(None);
        }
        let status = self.current(tenant, work, character_id, quest_id).await?;
        if status.state != QuestState::Started || status.is_expired(now) {
            return Ok(None);
        }
        if !definition.requirements_met(&status.progress) {
            return Ok(None);
        }
        self.complete_in(tenant, work, character_id, quest_id, now)
            .await
            .map(Some)
    }

    fn update_progress(work: &mut Work, mut status: QuestStatus, info_number: u32, progress: String) {
        status.progress.insert(info_number, progress.clone());
        work.record(
            status,
            QuestStatusKind::ProgressUpdated {
                info_number,
                progress,
            },
        );
    }

    /// Starts a quest. A completed quest may start again only when it is
    /// repeatable and its interval has elapsed.
    #[tracing::instrument(skip(self, tenant, origin), fields(tenant_id = %tenant.id))]
    pub async fn start(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<QuestStatus> {
        let _guard = self.lock(tenant.id, character_id).await;
        let mut work = Work::new(origin.into());
        let status = self
            .start_in(tenant, &mut work, character_id, quest_id, true, Utc::now())
            .await?;
        self.finish(tenant, work).await?;
        tracing::debug!(character_id, quest_id, "quest started");
        Ok(status)
    }

    /// Starts the next quest of a chain, skipping the repeat interval check.
    #[tracing::instrument(skip(self, tenant, origin), fields(tenant_id = %tenant.id))]
    pub async fn start_chained(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<QuestStatus> {
        let _guard = self.lock(tenant.id, character_id).await;
        let mut work = Work::new(origin.into());
        let status = self
            .start_in(tenant, &mut work, character_id, quest_id, false, Utc::now())
            .await?;
        self.finish(tenant, work).await?;
        Ok(status)
    }

    /// Completes a started quest, returning the chain's next quest id.
    #[tracing::instrument(skip(self, tenant, origin), fields(tenant_id = %tenant.id))]
    pub async fn complete(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<Completion> {
        let _guard = self.lock(tenant.id, character_id).await;
        let mut work = Work::new(origin.into());
        let completion = self
            .complete_in(tenant, &mut work, character_id, quest_id, Utc::now())
            .await?;
        self.finish(tenant, work).await?;
        tracing::debug!(character_id, quest_id, "quest completed");
        Ok(completion)
    }

    /// Abandons a started quest and clears its progress.
    pub async fn forfeit(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<()> {
        let _guard = self.lock(tenant.id, character_id).await;
        let mut work = Work::new(origin.into());
        let mut status = self.current(tenant, &work, character_id, quest_id).await?;
        if status.state != QuestState::Started {
            return Err(QuestError::NotStarted(quest_id));
        }
        status.state = QuestState::NotStarted;
        status.progress.clear();
        status.expiration_time = None;
        status.forfeit_count += 1;
        work.record(status, QuestStatusKind::Forfeited);
        self.finish(tenant, work).await
    }

    /// Sets one progress row of a started quest, creating it if absent.
    pub async fn set_progress(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        quest_id: u32,
        info_number: u32,
        progress: String,
    ) -> Result<()> {
        let _guard = self.lock(tenant.id, character_id).await;
        let mut work = Work::new(origin.into());
        let status = self.current(tenant, &work, character_id, quest_id).await?;
        if status.state != QuestState::Started {
            return Err(QuestError::NotStarted(quest_id));
        }
        Self::update_progress(&mut work, status, info_number, progress);
        self.finish(tenant, work).await
    }

    /// Completes an auto-complete quest whose kill counts and visit flags
    /// are satisfied. Returns `None` when nothing was completed.
    pub async fn check_auto_complete(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<Option<Completion>> {
        let _guard = self.lock(tenant.id, character_id).await;
        let mut work = Work::new(origin.into());
        let completion = self
            .auto_complete_in(tenant, &mut work, character_id, quest_id, Utc::now())
            .await?;
        self.finish(tenant, work).await?;
        Ok(completion)
    }

    /// Starts every quest declared to auto-start on `map_id` that the
    /// character may start. Returns the ids actually started.
    pub async fn check_auto_start(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        map_id: u32,
    ) -> Result<Vec<u32>> {
        let _guard = self.lock(tenant.id, character_id).await;
        let now = Utc::now();
        let mut work = Work::new(origin.into());
        let mut started = Vec::new();
        for definition in self.definitions.auto_start_on(map_id) {
            match self
                .start_in(tenant, &mut work, character_id, definition.id, true, now)
                .await
            {
                Ok(_) => started.push(definition.id),
                Err(
                    QuestError::AlreadyStarted(_)
                    | QuestError::AlreadyCompleted(_)
                    | QuestError::IntervalNotElapsed(_),
                ) => {}
                Err(e) => return Err(e),
            }
        }
        self.finish(tenant, work).await?;
        Ok(started)
    }

    /// Counts a kill toward every started quest requiring `mob_id`, then
    /// completes and chains whatever became complete.
    #[tracing::instrument(skip(self, tenant, origin), fields(tenant_id = %tenant.id))]
    pub async fn record_monster_kill(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        mob_id: u32,
    ) -> Result<Vec<Completion>> {
        let _guard = self.lock(tenant.id, character_id).await;
        let now = Utc::now();
        let mut work = Work::new(origin.into());
        let mut touched = Vec::new();

        for status in self.repository.get_all(tenant.id, character_id).await? {
            if status.state != QuestState::Started || status.is_expired(now) {
                continue;
            }
            let Some(definition) = self.definitions.definition(status.quest_id) else {
                continue;
            };
            let Some(required) = definition.mob_requirements.get(&mob_id).copied() else {
                continue;
            };
            let count = status
                .progress_of(mob_id)
                .and_then(|p| p.parse::<u32>().ok())
                .unwrap_or(0);
            if count >= required {
                continue;
            }
            touched.push(status.quest_id);
            Self::update_progress(&mut work, status, mob_id, format!("{:03}", count + 1));
        }

        let completions = self.complete_touched(tenant, &mut work, character_id, touched, now).await?;
        self.finish(tenant, work).await?;
        Ok(completions)
    }

    /// Flags `map_id` as visited for every started quest requiring it, then
    /// completes and chains whatever became complete.
    pub async fn record_map_entered(
        &self,
        tenant: &Tenant,
        origin: impl Into<Origin>,
        character_id: CharacterId,
        map_id: u32,
    ) -> Result<Vec<Completion>> {
        let _guard = self.lock(tenant.id, character_id).await;
        let now = Utc::now();
        let mut work = Work::new(origin.into());
        let mut touched = Vec::new();

        for status in self.repository.get_all(tenant.id, character_id).await? {
            if status.state != QuestState::Started || status.progress_of(map_id) != Some("0") {
                continue;
            }
            let requires = self
                .definitions
                .definition(status.quest_id)
                .is_some_and(|d| d.map_requirements.contains(&map_id));
            if !requires {
                continue;
            }
            touched.push(status.quest_id);
            Self::update_progress(&mut work, status, map_id, "1".to_string());
        }

        let completions = self.complete_touched(tenant, &mut work, character_id, touched, now).await?;
        self.finish(tenant, work).await?;
        Ok(completions)
    }

    async fn complete_touched(
        &self,
        tenant: &Tenant,
        work: &mut Work,
        character_id: CharacterId,
        quest_ids: Vec<u32>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Completion>> {
        let mut completions = Vec::new();
        for quest_id in quest_ids {
            let Some(completion) = self
                .auto_complete_in(tenant, work, character_id, quest_id, now)
                .await?
            else {
                continue;
            };
            if let Some(next) = completion.next_quest_id {
                match self.start_in(tenant, work, character_id, next, false, now).await {
                    Ok(_) | Err(QuestError::AlreadyStarted(_)) => {}
                    Err(e) => return Err(e),
                }
            }
            completions.push(completion);
        }
        Ok(completions)
    }

    pub async fn get(
        &self,
        tenant: &Tenant,
        character_id: CharacterId,
        quest_id: u32,
    ) -> Result<Option<QuestStatus>> {
        self.repository.get(tenant.id, character_id, quest_id).await
    }

    pub async fn get_all(&self, tenant: &Tenant, character_id: CharacterId) -> Result<Vec<QuestStatus>> {
        self.repository.get_all(tenant.id, character_id).await
    }

    /// Drops every quest record of a deleted character.
    pub async fn delete_by_character(&self, tenant: &Tenant, character_id: CharacterId) -> Result<()> {
        let _guard = self.lock(tenant.id, character_id).await;
        self.repository.delete_by_character(tenant.id, character_id).await
    }
}
