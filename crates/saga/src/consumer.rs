//! Bus consumers feeding the saga engine.
//!
//! Each status consumer turns an event into an [`Outcome`] plus a matcher
//! for the action the event answers, and hands both to
//! [`SagaEngine::step_completed`] together with the correlation id the
//! event echoes.

use std::sync::Arc;

use async_trait::async_trait;
use bus::{BusError, Message, MessageHandler, Publisher};
use common::{Origin, TransactionId};
use drops::{DropStatusEvent, DropStatusKind};
use inventory::{CompartmentStatusEvent, CompartmentStatusKind};
use quest::{QuestStatusEvent, QuestStatusKind};
use saga_store::SagaStore;

use crate::commands::{ServiceStatusEvent, ServiceStatusKind};
use crate::dispatcher::{inventory_command, quest_command};
use crate::engine::{Outcome, SagaEngine};
use crate::saga::StepDetails;
use crate::{Action, Saga, SagaError};

/// Reason reported when a drop reservation loses to another character.
pub const RESERVED_BY_ANOTHER_PARTY: &str = "reserved by another party";

/// Maps an engine result to the bus contract: transient failures are
/// redelivered, everything else is logged and acknowledged.
fn settle(
    consumer: &'static str,
    transaction_id: TransactionId,
    result: crate::Result<bool>,
) -> bus::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(SagaError::NotFound(_)) => {
            tracing::debug!(consumer, %transaction_id, "status event for unknown saga");
            Ok(())
        }
        Err(e) if e.is_transient() => Err(BusError::Handler(e.to_string())),
        Err(e) => {
            tracing::warn!(consumer, %transaction_id, error = %e, "status event rejected");
            Ok(())
        }
    }
}

/// Consumes `event.compartment-status`.
pub struct CompartmentStatusHandler<S, P> {
    engine: Arc<SagaEngine<S, P>>,
}

impl<S, P> CompartmentStatusHandler<S, P> {
    pub fn new(engine: Arc<SagaEngine<S, P>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<S, P> MessageHandler for CompartmentStatusHandler<S, P>
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    fn name(&self) -> &'static str {
        "saga_compartment_status"
    }

    async fn handle(&self, message: &Message) -> bus::Result<()> {
        let event: CompartmentStatusEvent = message.decode()?;
        let tenant = message.tenant();
        let tx = event.transaction_id;

        let (command, outcome) = match &event.kind {
            CompartmentStatusKind::Completed {
                command,
                slot,
                asset_id,
                reference_id,
            } => (
                command.as_str(),
                Outcome::Success(StepDetails {
                    slot: *slot,
                    asset_id: *asset_id,
                    reference_id: *reference_id,
                }),
            ),
            CompartmentStatusKind::Error {
                command, reason, ..
            } => (command.as_str(), Outcome::Failure(reason.clone())),
        };

        let origin = Origin::new(tx, event.correlation_id.clone());
        let matches = |action: &Action| {
            inventory_command(&origin, action)
                .ok()
                .flatten()
                .is_some_and(|c| {
                    c.kind.name() == command
                        && c.kind.compartment() == event.compartment
                        && c.character_id == event.character_id
                })
        };
        let result = self
            .engine
            .step_completed(&tenant, origin.clone(), matches, outcome)
            .await;
        settle(self.name(), tx, result)
    }
}

/// Consumes `event.drop-status`.
pub struct DropStatusHandler<S, P> {
    engine: Arc<SagaEngine<S, P>>,
}

impl<S, P> DropStatusHandler<S, P> {
    pub fn new(engine: Arc<SagaEngine<S, P>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<S, P> MessageHandler for DropStatusHandler<S, P>
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    fn name(&self) -> &'static str {
        "saga_drop_status"
    }

    async fn handle(&self, message: &Message) -> bus::Result<()> {
        let event: DropStatusEvent = message.decode()?;
        let tenant = message.tenant();
        let tx = event.transaction_id;
        let field = event.field;
        let drop_id = event.drop_id;
        let origin = Origin::new(tx, event.correlation_id.clone());

        let (matches, outcome): (Box<dyn Fn(&Action) -> bool + Send + Sync>, Outcome) =
            match event.kind {
                DropStatusKind::Created(body) => (
                    Box::new(move |a: &Action| {
                        matches!(a, Action::SpawnDrop(p)
                            if p.field == field
                                && p.drop.item_id == body.item_id
                                && p.drop.meso == body.meso)
                    }),
                    Outcome::Success(StepDetails {
                        asset_id: Some(drop_id),
                        ..StepDetails::default()
                    }),
                ),
                DropStatusKind::Reserved(holder) => (
                    Box::new(move |a: &Action| {
                        matches!(a, Action::ReserveDrop(p)
                            if p.drop_id == drop_id && p.character_id == holder.character_id)
                    }),
                    Outcome::success(),
                ),
                DropStatusKind::ReservationFailure { character_id } => (
                    Box::new(move |a: &Action| {
                        matches!(a, Action::ReserveDrop(p)
                            if p.drop_id == drop_id && p.character_id == character_id)
                    }),
                    Outcome::Failure(RESERVED_BY_ANOTHER_PARTY.to_string()),
                ),
                DropStatusKind::ReservationCancelled { character_id } => (
                    Box::new(move |a: &Action| {
                        matches!(a, Action::CancelDropReservation(p)
                            if p.drop_id == drop_id && p.character_id == character_id)
                    }),
                    Outcome::success(),
                ),
                DropStatusKind::PickedUp(holder) => (
                    Box::new(move |a: &Action| {
                        matches!(a, Action::GatherDrop(p)
                            if p.drop_id == drop_id && p.character_id == holder.character_id)
                    }),
                    Outcome::success(),
                ),
                DropStatusKind::Consumed | DropStatusKind::Expired => return Ok(()),
            };

        let result = self
            .engine
            .step_completed(&tenant, origin, matches.as_ref(), outcome)
            .await;
        settle(self.name(), tx, result)
    }
}

/// Consumes `event.quest-status`.
pub struct QuestStatusHandler<S, P> {
    engine: Arc<SagaEngine<S, P>>,
}

impl<S, P> QuestStatusHandler<S, P> {
    pub fn new(engine: Arc<SagaEngine<S, P>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<S, P> MessageHandler for QuestStatusHandler<S, P>
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    fn name(&self) -> &'static str {
        "saga_quest_status"
    }

    async fn handle(&self, message: &Message) -> bus::Result<()> {
        let event: QuestStatusEvent = message.decode()?;
        let tenant = message.tenant();
        let tx = event.transaction_id;
        let character_id = event.character_id;
        let quest_id = event.quest_id;

        let (command, outcome) = match &event.kind {
            QuestStatusKind::Started => ("START", Outcome::success()),
            QuestStatusKind::Completed { .. } => ("COMPLETE", Outcome::success()),
            QuestStatusKind::ProgressUpdated { .. } => ("SET_PROGRESS", Outcome::success()),
            QuestStatusKind::Error {
                command, reason, ..
            } => (command.as_str(), Outcome::Failure(reason.clone())),
            QuestStatusKind::Forfeited => return Ok(()),
        };

        let origin = Origin::new(tx, event.correlation_id.clone());
        let matches = |action: &Action| {
            quest_command(&origin, action).is_some_and(|c| {
                c.kind.name() == command
                    && c.kind.quest_id() == Some(quest_id)
                    && c.character_id == character_id
            })
        };
        let result = self
            .engine
            .step_completed(&tenant, origin.clone(), matches, outcome)
            .await;
        settle(self.name(), tx, result)
    }
}

/// Consumes `event.character-status`, where the services without an
/// engine in this workspace report step outcomes.
pub struct ServiceStatusHandler<S, P> {
    engine: Arc<SagaEngine<S, P>>,
}

impl<S, P> ServiceStatusHandler<S, P> {
    pub fn new(engine: Arc<SagaEngine<S, P>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<S, P> MessageHandler for ServiceStatusHandler<S, P>
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    fn name(&self) -> &'static str {
        "saga_service_status"
    }

    async fn handle(&self, message: &Message) -> bus::Result<()> {
        let event: ServiceStatusEvent = message.decode()?;
        let tenant = message.tenant();
        let tx = event.transaction_id;

        let outcome = match &event.kind {
            ServiceStatusKind::Completed { .. } => Outcome::success(),
            ServiceStatusKind::Error { reason, .. } => Outcome::Failure(reason.clone()),
        };
        let action_name = event.kind.action();
        let matches = |action: &Action| {
            action.name() == action_name
                && action.character_id().unwrap_or_default() == event.character_id
        };
        let origin = Origin::new(tx, event.correlation_id.clone());
        let result = self.engine.step_completed(&tenant, origin, matches, outcome).await;
        settle(self.name(), tx, result)
    }
}

/// Consumes `command.saga`: sagas submitted by other services.
pub struct SagaCommandHandler<S, P> {
    engine: Arc<SagaEngine<S, P>>,
}

impl<S, P> SagaCommandHandler<S, P> {
    pub fn new(engine: Arc<SagaEngine<S, P>>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl<S, P> MessageHandler for SagaCommandHandler<S, P>
where
    S: SagaStore + 'static,
    P: Publisher + 'static,
{
    fn name(&self) -> &'static str {
        "saga_command"
    }

    async fn handle(&self, message: &Message) -> bus::Result<()> {
        let saga: Saga = message.decode()?;
        let tenant = message.tenant();
        let tx = saga.transaction_id;

        match self.engine.put(&tenant, saga).await {
            Ok(_) => Ok(()),
            Err(SagaError::AlreadyExists(_)) => {
                tracing::debug!(transaction_id = %tx, "saga already submitted");
                Ok(())
            }
            Err(e) if e.is_transient() => Err(BusError::Handler(e.to_string())),
            Err(e) => {
                tracing::warn!(transaction_id = %tx, error = %e, "saga submission rejected");
                Ok(())
            }
        }
    }
}
