//! Terminal saga status events.

use common::{CharacterId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::{ErrorCode, Saga, SagaType};

/// Published on `event.saga-status` when a saga ends, keyed by transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaStatusEvent {
    pub transaction_id: TransactionId,
    #[serde(flatten)]
    pub kind: SagaStatusKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum SagaStatusKind {
    Completed,
    Failed {
        reason: String,
        failed_step: String,
        character_id: CharacterId,
        saga_type: SagaType,
        error_code: ErrorCode,
    },
}

impl SagaStatusEvent {
    pub fn completed(saga: &Saga) -> Self {
        Self {
            transaction_id: saga.transaction_id,
            kind: SagaStatusKind::Completed,
        }
    }

    /// Failure event for `saga`, reporting its first failed step.
    pub fn failed(saga: &Saga) -> Self {
        let (reason, failed_step, error_code) = match &saga.failure {
            Some(failure) => (
                failure.reason.clone(),
                failure.step_id.clone(),
                ErrorCode::for_failure(saga.saga_type, &failure.action),
            ),
            None => (String::new(), String::new(), ErrorCode::Unknown),
        };
        Self {
            transaction_id: saga.transaction_id,
            kind: SagaStatusKind::Failed {
                reason,
                failed_step,
                character_id: saga.character_id(),
                saga_type: saga.saga_type,
                error_code,
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.kind, SagaStatusKind::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, AwardMesosPayload, UpdateStorageMesosPayload, StorageMesosOperation};
    use crate::saga::StepDetails;

    #[test]
    fn test_failed_event_wire_shape() {
        let saga = Saga::builder(SagaType::StorageOperation, "npc")
            .step(
                "fee",
                Action::AwardMesos(AwardMesosPayload {
                    character_id: 42,
                    world_id: 0,
                    channel_id: 1,
                    actor_id: 9010000,
                    actor_type: "NPC".to_string(),
                    amount: -500,
                }),
            )
            .step(
                "store",
                Action::UpdateStorageMesos(UpdateStorageMesosPayload {
                    character_id: 42,
                    account_id: 7,
                    world_id: 0,
                    operation: StorageMesosOperation::Add,
                    mesos: 500,
                }),
            )
            .build()
            .unwrap()
            .fail_step(0, "insufficient mesos")
            .unwrap()
            .compensate_step(0)
            .unwrap();

        let json = serde_json::to_value(SagaStatusEvent::failed(&saga)).unwrap();
        assert_eq!(json["type"], "FAILED");
        assert_eq!(json["body"]["reason"], "insufficient mesos");
        assert_eq!(json["body"]["failedStep"], "fee");
        assert_eq!(json["body"]["characterId"], 42);
        assert_eq!(json["body"]["sagaType"], "storage_operation");
        assert_eq!(json["body"]["errorCode"], "not_enough_mesos");
    }

    #[test]
    fn test_completed_event_wire_shape() {
        let saga = Saga::builder(SagaType::QuestReward, "quest")
            .step(
                "mesos",
                Action::AwardMesos(AwardMesosPayload {
                    character_id: 1,
                    world_id: 0,
                    channel_id: 0,
                    actor_id: 0,
                    actor_type: "SYSTEM".to_string(),
                    amount: 10,
                }),
            )
            .build()
            .unwrap()
            .complete_step(0, StepDetails::default())
            .unwrap();
        let event = SagaStatusEvent::completed(&saga);
        assert!(event.is_completed());
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "COMPLETED");
        assert_eq!(json["transactionId"], serde_json::to_value(saga.transaction_id).unwrap());
    }
}
