//! Saga model.
//!
//! A [`Saga`] is an ordered list of [`Step`]s advanced one at a time. Every
//! mutation goes through a method that validates the step transition and
//! the consistency of the whole saga before returning the new value; the
//! engine persists the result with optimistic locking.

use chrono::{DateTime, Duration, Utc};
use common::{CharacterId, Tenant, TransactionId};
use saga_store::{SagaRecord, SagaStatus, Version};
use serde::{Deserialize, Serialize};

use crate::{Action, Result, SagaError, StepStatus};
use crate::action::EquipAssetPayload;

/// Step id prefix of the equip step injected after a completed
/// `create_and_equip_asset`.
pub const AUTO_EQUIP_PREFIX: &str = "auto_equip_step_";

/// Business flow a saga implements. Drives error-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaType {
    InventoryTransaction,
    QuestReward,
    QuestCompletion,
    TradeTransaction,
    CharacterCreation,
    StorageOperation,
    CharacterRespawn,
}

impl SagaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaType::InventoryTransaction => "inventory_transaction",
            SagaType::QuestReward => "quest_reward",
            SagaType::QuestCompletion => "quest_completion",
            SagaType::TradeTransaction => "trade_transaction",
            SagaType::CharacterCreation => "character_creation",
            SagaType::StorageOperation => "storage_operation",
            SagaType::CharacterRespawn => "character_respawn",
        }
    }
}

impl std::fmt::Display for SagaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the owning service reported when a step completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<i16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<u32>,
}

impl StepDetails {
    pub fn slot(slot: i16) -> Self {
        Self {
            slot: Some(slot),
            ..Self::default()
        }
    }
}

/// One action within a saga.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub step_id: String,
    pub status: StepStatus,
    #[serde(flatten)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StepDetails>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Step {
    pub fn new(step_id: impl Into<String>, action: Action) -> Self {
        let now = Utc::now();
        Self {
            step_id: step_id.into(),
            status: StepStatus::Pending,
            action,
            details: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The first failure of a saga, reported on the terminal event after
/// compensation has rewritten the step statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub step_id: String,
    pub action: String,
    pub reason: String,
}

/// An orchestrated sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Saga {
    pub transaction_id: TransactionId,
    pub saga_type: SagaType,
    pub initiated_by: String,
    pub status: SagaStatus,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<Failure>,
    /// Version last read from the store.
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
    /// Deadline for the saga. A deadline not in the future when the saga
    /// is submitted is replaced by the engine's default timeout.
    #[serde(default)]
    pub timeout_at: DateTime<Utc>,
}

impl Saga {
    pub fn builder(saga_type: SagaType, initiated_by: impl Into<String>) -> SagaBuilder {
        SagaBuilder::new(saga_type, initiated_by)
    }

    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.step_id == step_id)
    }

    pub fn earliest_pending(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| s.status == StepStatus::Pending)
    }

    pub fn failed_index(&self) -> Option<usize> {
        self.steps.iter().position(|s| s.status == StepStatus::Failed)
    }

    /// Last completed step before `index`.
    pub fn last_completed_before(&self, index: usize) -> Option<usize> {
        self.steps[..index.min(self.steps.len())]
            .iter()
            .rposition(|s| s.status == StepStatus::Completed)
    }

    pub fn completed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }

    /// True while the failed step is the saga's original failure, i.e.
    /// compensation has not started reversing anything yet.
    pub fn is_original_failure(&self, index: usize) -> bool {
        self.failure
            .as_ref()
            .is_some_and(|f| self.steps.get(index).is_some_and(|s| s.step_id == f.step_id))
    }

    /// Character the saga acts for: the first step that names one.
    pub fn character_id(&self) -> CharacterId {
        self.steps
            .iter()
            .find_map(|s| s.action.character_id())
            .unwrap_or_default()
    }

    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.timeout_at < now
    }

    /// Checks the step-ordering and status invariants.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(SagaError::Invalid("saga has no steps".to_string()));
        }

        for (i, step) in self.steps.iter().enumerate() {
            if self.steps[..i].iter().any(|s| s.step_id == step.step_id) {
                return Err(SagaError::Invalid(format!(
                    "duplicate step id '{}' at index {i}",
                    step.step_id
                )));
            }
        }

        // completed prefix, at most one failed, pending tail
        let mut phase = StepStatus::Completed;
        for (i, step) in self.steps.iter().enumerate() {
            match (phase, step.status) {
                (StepStatus::Completed, StepStatus::Completed) => {}
                (StepStatus::Completed, other) => phase = other,
                (StepStatus::Failed, StepStatus::Pending) => phase = StepStatus::Pending,
                (StepStatus::Pending, StepStatus::Pending) => {}
                (_, status) => {
                    return Err(SagaError::Invalid(format!(
                        "step '{}' at index {i} is {status} out of order",
                        step.step_id
                    )));
                }
            }
        }

        let failed = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .count();
        let all_completed = self.completed_count() == self.steps.len();
        match self.status {
            SagaStatus::Active if failed > 0 => Err(SagaError::Invalid(
                "active saga has a failed step".to_string(),
            )),
            SagaStatus::Compensating if failed != 1 => Err(SagaError::Invalid(format!(
                "compensating saga has {failed} failed steps, expected 1"
            ))),
            SagaStatus::Completed if !all_completed => Err(SagaError::Invalid(
                "completed saga has unfinished steps".to_string(),
            )),
            status if status != SagaStatus::Completed && all_completed => Err(
                SagaError::Invalid(format!("every step completed but saga is {status}")),
            ),
            _ => Ok(()),
        }
    }

    /// Returns a new saga with the step at `index` moved to `status`.
    pub fn with_step_status(&self, index: usize, status: StepStatus) -> Result<Saga> {
        let step = self.steps.get(index).ok_or(SagaError::StepIndex(index))?;
        if !step.status.can_transition_to(status) {
            return Err(SagaError::IllegalTransition {
                step_id: step.step_id.clone(),
                from: step.status,
                to: status,
            });
        }
        let now = Utc::now();
        let mut next = self.clone();
        next.steps[index].status = status;
        next.steps[index].updated_at = now;
        next.updated_at = now;
        Ok(next)
    }

    /// Returns a new saga with `step` inserted right after `index`.
    pub fn with_step_after_index(&self, index: usize, step: Step) -> Result<Saga> {
        if index >= self.steps.len() {
            return Err(SagaError::StepIndex(index));
        }
        if self.step_index(&step.step_id).is_some() {
            return Err(SagaError::Invalid(format!(
                "step id '{}' already exists",
                step.step_id
            )));
        }
        let mut next = self.clone();
        next.steps.insert(index + 1, step);
        next.updated_at = Utc::now();
        Ok(next)
    }

    /// Completes the step at `index`. Completing a `create_and_equip_asset`
    /// that reported its slot injects the equip step right after it.
    pub fn complete_step(&self, index: usize, details: StepDetails) -> Result<Saga> {
        let mut next = self.with_step_status(index, StepStatus::Completed)?;
        next.steps[index].details = Some(details);

        if let Action::CreateAndEquipAsset(payload) = &next.steps[index].action
            && let Some(slot) = details.slot
        {
            let step_id = format!("{AUTO_EQUIP_PREFIX}{}", next.steps[index].step_id);
            let equip = Action::EquipAsset(EquipAssetPayload {
                character_id: payload.character_id,
                source: slot,
                destination: None,
            });
            next = next.with_step_after_index(index, Step::new(step_id, equip))?;
        }

        if next.completed_count() == next.steps.len() {
            next.status = SagaStatus::Completed;
        }
        next.validate()?;
        Ok(next)
    }

    /// Fails the step at `index` and starts compensation.
    pub fn fail_step(&self, index: usize, reason: impl Into<String>) -> Result<Saga> {
        let mut next = self.with_step_status(index, StepStatus::Failed)?;
        let step = &next.steps[index];
        next.failure.get_or_insert_with(|| Failure {
            step_id: step.step_id.clone(),
            action: step.action.name().to_string(),
            reason: reason.into(),
        });
        next.status = SagaStatus::Compensating;
        next.validate()?;
        Ok(next)
    }

    /// Marks the failed step at `index` compensated and moves the failure
    /// marker onto the previous completed step, whose reverse runs next.
    /// With nothing left to reverse the saga becomes Failed.
    pub fn compensate_step(&self, index: usize) -> Result<Saga> {
        let mut next = self.with_step_status(index, StepStatus::Pending)?;
        match next.last_completed_before(index) {
            Some(previous) => next = next.with_step_status(previous, StepStatus::Failed)?,
            None => next.status = SagaStatus::Failed,
        }
        next.validate()?;
        Ok(next)
    }

    /// Ends the saga as Failed without further compensation.
    pub fn abandon(&self) -> Saga {
        let mut next = self.clone();
        next.status = SagaStatus::Failed;
        next.updated_at = Utc::now();
        next
    }

    /// Serializes the saga for the store.
    pub fn to_record(&self, tenant: &Tenant) -> Result<SagaRecord> {
        Ok(SagaRecord {
            tenant: tenant.clone(),
            transaction_id: self.transaction_id,
            saga_type: self.saga_type.as_str().to_string(),
            initiated_by: self.initiated_by.clone(),
            status: self.status,
            data: serde_json::to_value(self)?,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            timeout_at: self.timeout_at,
        })
    }

    /// Rebuilds a saga from a stored record. Status, version and deadline
    /// come from the record, which the store may have moved on its own.
    pub fn from_record(record: &SagaRecord) -> Result<Saga> {
        let mut saga: Saga = serde_json::from_value(record.data.clone())?;
        saga.status = record.status;
        saga.version = record.version;
        saga.timeout_at = record.timeout_at;
        Ok(saga)
    }
}

/// Builds a validated [`Saga`].
#[derive(Debug, Clone)]
pub struct SagaBuilder {
    transaction_id: TransactionId,
    saga_type: SagaType,
    initiated_by: String,
    steps: Vec<Step>,
    timeout: Option<Duration>,
}

impl SagaBuilder {
    pub fn new(saga_type: SagaType, initiated_by: impl Into<String>) -> Self {
        Self {
            transaction_id: TransactionId::new(),
            saga_type,
            initiated_by: initiated_by.into(),
            steps: Vec::new(),
            timeout: None,
        }
    }

    pub fn transaction_id(mut self, transaction_id: TransactionId) -> Self {
        self.transaction_id = transaction_id;
        self
    }

    /// Overrides the engine's default timeout for this saga.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn step(mut self, step_id: impl Into<String>, action: Action) -> Self {
        self.steps.push(Step::new(step_id, action));
        self
    }

    pub fn build(self) -> Result<Saga> {
        let now = Utc::now();
        let saga = Saga {
            transaction_id: self.transaction_id,
            saga_type: self.saga_type,
            initiated_by: self.initiated_by,
            status: SagaStatus::Active,
            steps: self.steps,
            failure: None,
            version: Version::initial(),
            created_at: now,
            updated_at: now,
            timeout_at: self.timeout.map_or(now, |timeout| now + timeout),
        };
        saga.validate()?;
        Ok(saga)
    }
}

#[cfg(test)]
mod tests {
    use common::TenantId;

    use super::*;
    use crate::action::{AwardItemPayload, AwardMesosPayload, CreateAndEquipAssetPayload, ItemPayload};

    fn mesos(amount: i32) -> Action {
        Action::AwardMesos(AwardMesosPayload {
            character_id: 42,
            world_id: 0,
            channel_id: 1,
            actor_id: 0,
            actor_type: "SYSTEM".to_string(),
            amount,
        })
    }

    fn award(template_id: u32) -> Action {
        Action::AwardAsset(AwardItemPayload {
            character_id: 42,
            item: ItemPayload {
                template_id,
                quantity: 1,
                expiration: None,
            },
        })
    }

    fn three_steps() -> Saga {
        Saga::builder(SagaType::InventoryTransaction, "test")
            .step("pay", mesos(-100))
            .step("give", award(2000000))
            .step("give_more", award(2000001))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_rejects_duplicate_step_ids() {
        let result = Saga::builder(SagaType::QuestReward, "test")
            .step("a", mesos(1))
            .step("a", mesos(2))
            .build();
        assert!(matches!(result, Err(SagaError::Invalid(_))));
    }

    #[test]
    fn test_build_rejects_empty_saga() {
        let result = Saga::builder(SagaType::QuestReward, "test").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let saga = three_steps();
        let err = saga.with_step_status(0, StepStatus::Pending).unwrap_err();
        assert!(matches!(
            err,
            SagaError::IllegalTransition {
                from: StepStatus::Pending,
                to: StepStatus::Pending,
                ..
            }
        ));
    }

    #[test]
    fn test_completing_out_of_order_fails_validation() {
        let saga = three_steps();
        assert!(saga.complete_step(1, StepDetails::default()).is_err());
    }

    #[test]
    fn test_completing_every_step_completes_saga() {
        let mut saga = three_steps();
        for i in 0..3 {
            assert_eq!(saga.status, SagaStatus::Active);
            saga = saga.complete_step(i, StepDetails::default()).unwrap();
        }
        assert_eq!(saga.status, SagaStatus::Completed);
        assert_eq!(saga.earliest_pending(), None);
    }

    #[test]
    fn test_failure_walks_back_through_completed_steps() {
        let saga = three_steps()
            .complete_step(0, StepDetails::default())
            .unwrap()
            .complete_step(1, StepDetails::default())
            .unwrap()
            .fail_step(2, "inventory full")
            .unwrap();
        assert_eq!(saga.status, SagaStatus::Compensating);
        assert!(saga.is_original_failure(2));

        let saga = saga.compensate_step(2).unwrap();
        assert_eq!(saga.failed_index(), Some(1));
        assert!(!saga.is_original_failure(1));
        assert_eq!(saga.status, SagaStatus::Compensating);

        let saga = saga.compensate_step(1).unwrap();
        assert_eq!(saga.failed_index(), Some(0));

        let saga = saga.compensate_step(0).unwrap();
        assert_eq!(saga.status, SagaStatus::Failed);
        assert!(saga.steps.iter().all(|s| s.status == StepStatus::Pending));

        let failure = saga.failure.unwrap();
        assert_eq!(failure.step_id, "give_more");
        assert_eq!(failure.action, "award_asset");
        assert_eq!(failure.reason, "inventory full");
    }

    #[test]
    fn test_create_and_equip_injects_equip_step() {
        let saga = Saga::builder(SagaType::InventoryTransaction, "test")
            .step(
                "create",
                Action::CreateAndEquipAsset(CreateAndEquipAssetPayload {
                    character_id: 42,
                    item: ItemPayload {
                        template_id: 1302000,
                        quantity: 1,
                        expiration: None,
                    },
                }),
            )
            .step("pay", mesos(-10))
            .build()
            .unwrap();

        let saga = saga.complete_step(0, StepDetails::slot(3)).unwrap();
        assert_eq!(saga.steps.len(), 3);
        assert_eq!(saga.steps[1].step_id, "auto_equip_step_create");
        assert_eq!(
            saga.steps[1].action,
            Action::EquipAsset(EquipAssetPayload {
                character_id: 42,
                source: 3,
                destination: None
            })
        );
        assert_eq!(saga.earliest_pending(), Some(1));
        assert_eq!(saga.status, SagaStatus::Active);
    }

    #[test]
    fn test_insert_after_out_of_range_index_rejected() {
        let saga = three_steps();
        assert!(matches!(
            saga.with_step_after_index(3, Step::new("x", mesos(1))),
            Err(SagaError::StepIndex(3))
        ));
    }

    #[test]
    fn test_serialization_roundtrip() {
        let saga = three_steps()
            .complete_step(0, StepDetails::slot(2))
            .unwrap();
        let json = serde_json::to_value(&saga).unwrap();
        assert_eq!(json["steps"][0]["action"], "award_mesos");
        assert_eq!(json["steps"][0]["status"], "completed");
        assert_eq!(json["sagaType"], "inventory_transaction");
        let back: Saga = serde_json::from_value(json).unwrap();
        assert_eq!(back, saga);
    }

    #[test]
    fn test_record_roundtrip_takes_store_fields() {
        let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);
        let saga = three_steps();
        let mut record = saga.to_record(&tenant).unwrap();
        assert_eq!(record.saga_type, "inventory_transaction");
        record.version = Version::new(4);
        record.status = SagaStatus::Compensating;

        let back = Saga::from_record(&record).unwrap();
        assert_eq!(back.version, Version::new(4));
        assert_eq!(back.status, SagaStatus::Compensating);
        assert_eq!(back.steps, saga.steps);
    }

    #[test]
    fn test_character_id_from_first_naming_step() {
        assert_eq!(three_steps().character_id(), 42);
    }
}
