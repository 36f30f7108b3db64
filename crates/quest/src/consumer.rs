use std::sync::Arc;

use async_trait::async_trait;
use bus::{Buffer, BusError, Message, MessageHandler, Publisher, Topic};
use common::{Origin, Tenant};

use crate::{
    QuestCommand, QuestCommandKind, QuestEngine, QuestError, QuestRepository, QuestStatusEvent,
    QuestStatusKind, Result,
};

/// Consumes `command.quest`.
///
/// Successful commands are reported by the engine's own status events; a
/// refused command publishes an `ERROR` status so a waiting saga step fails
/// instead of timing out.
pub struct QuestCommandHandler<R, P> {
    engine: Arc<QuestEngine<R, P>>,
}

impl<R, P> QuestCommandHandler<R, P>
where
    R: QuestRepository,
    P: Publisher,
{
    pub fn new(engine: Arc<QuestEngine<R, P>>) -> Self {
        Self { engine }
    }

    async fn execute(&self, tenant: &Tenant, command: &QuestCommand) -> Result<()> {
        let origin = Origin::new(command.transaction_id, command.correlation_id.clone());
        let character_id = command.character_id;
        match &command.kind {
            QuestCommandKind::Start { quest_id, chained } => {
                if *chained {
                    self.engine.start_chained(tenant, origin.clone(), character_id, *quest_id).await?;
                } else {
                    self.engine.start(tenant, origin.clone(), character_id, *quest_id).await?;
                }
            }
            QuestCommandKind::Complete {
                quest_id,
                start_next,
            } => {
                let completion = self.engine.complete(tenant, origin.clone(), character_id, *quest_id).await?;
                if *start_next && let Some(next) = completion.next_quest_id {
                    self.engine.start_chained(tenant, origin.clone(), character_id, next).await?;
                }
            }
            QuestCommandKind::Forfeit { quest_id } => {
                self.engine.forfeit(tenant, origin.clone(), character_id, *quest_id).await?;
            }
            QuestCommandKind::SetProgress {
                quest_id,
                info_number,
                progress,
            } => {
                self.engine
                    .set_progress(tenant, origin.clone(), character_id, *quest_id, *info_number, progress.clone())
                    .await?;
                self.engine
                    .check_auto_complete(tenant, origin.clone(), character_id, *quest_id)
                    .await?;
            }
            QuestCommandKind::MonsterKilled { monster_id } => {
                self.engine
                    .record_monster_kill(tenant, origin.clone(), character_id, *monster_id)
                    .await?;
            }
            QuestCommandKind::MapEntered { map_id } => {
                self.engine
                    .record_map_entered(tenant, origin.clone(), character_id, *map_id)
                    .await?;
                self.engine
                    .check_auto_start(tenant, origin.clone(), character_id, *map_id)
                    .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<R, P> MessageHandler for QuestCommandHandler<R, P>
where
    R: QuestRepository + 'static,
    P: Publisher + 'static,
{
    fn name(&self) -> &'static str {
        "quest_command"
    }

    async fn handle(&self, message: &Message) -> bus::Result<()> {
        let command: QuestCommand = message.decode()?;
        let tenant = message.tenant();

        let error = match self.execute(&tenant, &command).await {
            Ok(()) => return Ok(()),
            Err(QuestError::Bus(e)) => return Err(e),
            Err(QuestError::Serialization(e)) => return Err(BusError::Serialization(e)),
            Err(e) => e,
        };

        tracing::debug!(
            transaction_id = %command.transaction_id,
            command = command.kind.name(),
            error = %error,
            "quest command refused"
        );
        let event = QuestStatusEvent::new(
            command.transaction_id,
            command.character_id,
            command.kind.quest_id().unwrap_or_default(),
            QuestStatusKind::Error {
                command: command.kind.name().to_string(),
                error_code: error.code().to_string(),
                reason: error.to_string(),
            },
        )
        .correlated(command.correlation_id.clone());
        let mut buffer = Buffer::new();
        buffer.put(Topic::EventQuestStatus, command.character_id, &tenant, &event)?;
        buffer.emit(self.engine.publisher()).await
    }
}
