//! Step dispatch.
//!
//! Turns the action of a step into the command understood by the owning
//! service and publishes it. Dispatch never changes step status itself;
//! the engine completes synchronous actions right away and waits for a
//! status event for the rest.

use bus::{Buffer, Publisher, Topic};
use common::{InventoryType, Origin, Tenant};
use drops::{DropCommand, DropCommandKind, SpawnDropBody};
use inventory::{CompartmentKey, InventoryCommand, InventoryCommandKind};
use quest::{QuestCommand, QuestCommandKind};

use crate::action::{ReactorDropType, SpawnReactorDropsPayload};
use crate::commands::ServiceCommand;
use crate::{Action, Result, SagaError};

/// Horizontal distance between drops fanned out from one reactor.
const REACTOR_DROP_SPACING: i64 = 25;

/// Which half of a step a command serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Forward,
    Reverse,
}

/// Correlation id stamped on the command a step dispatches. A status event
/// settles the step only if it echoes this id.
pub fn correlation_id(step_id: &str, phase: Phase) -> String {
    match phase {
        Phase::Forward => step_id.to_string(),
        Phase::Reverse => format!("{step_id}/reverse"),
    }
}

/// What the engine should do after a step was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A status event will complete the step.
    Awaiting,
    /// No status event follows; the step is complete.
    Completed,
}

/// Publishes step commands.
pub struct Dispatcher<P> {
    publisher: P,
}

impl<P: Publisher> Dispatcher<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    #[tracing::instrument(
        skip(self, tenant, origin, action),
        fields(
            tenant_id = %tenant.id,
            transaction_id = %origin.transaction_id,
            correlation_id = origin.correlation_id.as_deref(),
            action = action.name()
        )
    )]
    pub async fn dispatch(
        &self,
        tenant: &Tenant,
        origin: &Origin,
        action: &Action,
    ) -> Result<Dispatch> {
        let mut buffer = Buffer::new();
        stage(&mut buffer, tenant, origin, action)?;
        buffer.emit(&self.publisher).await?;

        metrics::counter!("saga_step_dispatched_total", "action" => action.name()).increment(1);
        tracing::debug!("step dispatched");

        if action.is_synchronous() {
            Ok(Dispatch::Completed)
        } else {
            Ok(Dispatch::Awaiting)
        }
    }
}

/// Stages the commands carrying `action` into `buffer`.
pub fn stage(buffer: &mut Buffer, tenant: &Tenant, origin: &Origin, action: &Action) -> Result<()> {
    if let Some(command) = inventory_command(origin, action)? {
        buffer.put(Topic::CommandInventory, command.character_id, tenant, &command)?;
        return Ok(());
    }
    if let Some(commands) = drop_commands(origin, action) {
        for command in commands {
            let key = match &command.kind {
                DropCommandKind::Spawn(_) => command.field.map_id,
                DropCommandKind::RequestReservation { drop_id, .. }
                | DropCommandKind::CancelReservation { drop_id, .. }
                | DropCommandKind::RequestPickUp { drop_id, .. }
                | DropCommandKind::Consume { drop_id } => *drop_id,
            };
            buffer.put(Topic::CommandDrop, key, tenant, &command)?;
        }
        return Ok(());
    }
    if let Some(command) = quest_command(origin, action) {
        buffer.put(Topic::CommandQuest, command.character_id, tenant, &command)?;
        return Ok(());
    }

    let topic = service_topic(action).ok_or_else(|| {
        SagaError::Invalid(format!("no route for action '{}'", action.name()))
    })?;
    let character_id = action.character_id().unwrap_or_default();
    let command = ServiceCommand {
        transaction_id: origin.transaction_id,
        character_id,
        correlation_id: origin.correlation_id.clone(),
        action: action.clone(),
    };
    buffer.put(topic, character_id, tenant, &command)?;
    Ok(())
}

fn inventory_type_of(template_id: u32) -> Result<InventoryType> {
    InventoryType::from_template_id(template_id)
        .ok_or_else(|| SagaError::Invalid(format!("template {template_id} has no inventory type")))
}

/// The inventory command for actions the compartment engine serves.
pub fn inventory_command(origin: &Origin, action: &Action) -> Result<Option<InventoryCommand>> {
    let (character_id, kind) = match action {
        Action::AwardInventory(p) | Action::AwardAsset(p) => (
            p.character_id,
            InventoryCommandKind::CreateAsset {
                inventory_type: inventory_type_of(p.item.template_id)?,
                template_id: p.item.template_id,
                quantity: p.item.quantity,
                expiration: p.item.expiration,
            },
        ),
        Action::CreateAndEquipAsset(p) => (
            p.character_id,
            InventoryCommandKind::CreateAsset {
                inventory_type: inventory_type_of(p.item.template_id)?,
                template_id: p.item.template_id,
                quantity: p.item.quantity,
                expiration: p.item.expiration,
            },
        ),
        Action::DestroyAsset(p) => (
            p.character_id,
            InventoryCommandKind::Destroy {
                inventory_type: inventory_type_of(p.template_id)?,
                template_id: p.template_id,
                quantity: p.quantity,
                remove_all: p.remove_all,
            },
        ),
        Action::DestroyAssetFromSlot(p) => (
            p.character_id,
            InventoryCommandKind::DestroyFromSlot {
                inventory_type: p.inventory_type,
                slot: p.slot,
                quantity: p.quantity,
            },
        ),
        Action::EquipAsset(p) => (
            p.character_id,
            InventoryCommandKind::Equip {
                source: p.source,
                destination: p.destination,
            },
        ),
        Action::UnequipAsset(p) => (
            p.character_id,
            InventoryCommandKind::Unequip {
                source: p.source,
                destination: p.destination,
            },
        ),
        Action::AcceptToCharacter(p) => (
            p.character_id,
            InventoryCommandKind::Accept {
                compartment: CompartmentKey::character(p.character_id, p.inventory_type),
                reference_id: p.reference_id,
                quantity: p.quantity,
            },
        ),
        Action::ReleaseFromCharacter(p) => (
            p.character_id,
            InventoryCommandKind::Release {
                compartment: CompartmentKey::character(p.character_id, p.inventory_type),
                asset_id: p.asset_id,
            },
        ),
        Action::AcceptToStorage(p) => (
            p.character_id,
            InventoryCommandKind::Accept {
                compartment: CompartmentKey::storage(p.account_id),
                reference_id: p.reference_id,
                quantity: p.quantity,
            },
        ),
        Action::ReleaseFromStorage(p) => (
            p.character_id,
            InventoryCommandKind::Release {
                compartment: CompartmentKey::storage(p.account_id),
                asset_id: p.asset_id,
            },
        ),
        Action::AcceptToCashShop(p) => (
            p.character_id,
            InventoryCommandKind::Accept {
                compartment: CompartmentKey::cash_shop(p.account_id),
                reference_id: p.reference_id,
                quantity: p.quantity,
            },
        ),
        Action::ReleaseFromCashShop(p) => (
            p.character_id,
            InventoryCommandKind::Release {
                compartment: CompartmentKey::cash_shop(p.account_id),
                asset_id: p.asset_id,
            },
        ),
        _ => return Ok(None),
    };
    Ok(Some(InventoryCommand {
        transaction_id: origin.transaction_id,
        character_id,
        correlation_id: origin.correlation_id.clone(),
        kind,
    }))
}

/// The drop commands for drop actions. Reactor drops fan out into one
/// spawn per entry.
pub fn drop_commands(origin: &Origin, action: &Action) -> Option<Vec<DropCommand>> {
    let command = |field, kind| DropCommand {
        transaction_id: origin.transaction_id,
        field,
        correlation_id: origin.correlation_id.clone(),
        kind,
    };
    let commands = match action {
        Action::SpawnDrop(p) => vec![command(p.field, DropCommandKind::Spawn(p.drop.clone()))],
        Action::ReserveDrop(p) => vec![command(
            p.field,
            DropCommandKind::RequestReservation {
                drop_id: p.drop_id,
                character_id: p.character_id,
                party_id: 0,
                pet_slot: p.pet_slot,
            },
        )],
        Action::CancelDropReservation(p) => vec![command(
            p.field,
            DropCommandKind::CancelReservation {
                drop_id: p.drop_id,
                character_id: p.character_id,
            },
        )],
        Action::GatherDrop(p) => vec![command(
            p.field,
            DropCommandKind::RequestPickUp {
                drop_id: p.drop_id,
                character_id: p.character_id,
            },
        )],
        Action::SpawnReactorDrops(p) => reactor_drop_bodies(p)
            .into_iter()
            .map(|body| command(p.field, DropCommandKind::Spawn(body)))
            .collect(),
        _ => return None,
    };
    Some(commands)
}

/// Spreads reactor drops around the reactor. Plain drops center on it;
/// sprays fan out to the right in drop order.
/// Positions are computed wide and clamped to the map coordinate range.
fn reactor_drop_bodies(payload: &SpawnReactorDropsPayload) -> Vec<SpawnDropBody> {
    let offset = |index: usize| {
        i64::try_from(index)
            .unwrap_or(i64::MAX)
            .saturating_mul(REACTOR_DROP_SPACING)
    };
    let x = i64::from(payload.x);
    let first = match payload.drop_type {
        ReactorDropType::Drop => x - offset(payload.drops.len().saturating_sub(1)) / 2,
        ReactorDropType::Spray => x,
    };
    payload
        .drops
        .iter()
        .enumerate()
        .map(|(i, entry)| SpawnDropBody {
            item_id: entry.item_id,
            quantity: entry.quantity,
            meso: entry.meso,
            x: clamp_coordinate(first.saturating_add(offset(i))),
            y: payload.y,
            owner_id: payload.character_id,
            dropper_id: payload.reactor_id,
            dropper_x: payload.x,
            dropper_y: payload.y,
            ..SpawnDropBody::default()
        })
        .collect()
}

fn clamp_coordinate(value: i64) -> i16 {
    value.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}

/// The quest command for quest actions.
pub fn quest_command(origin: &Origin, action: &Action) -> Option<QuestCommand> {
    let (character_id, kind) = match action {
        Action::StartQuest(p) => (
            p.character_id,
            QuestCommandKind::Start {
                quest_id: p.quest_id,
                chained: false,
            },
        ),
        Action::CompleteQuest(p) => (
            p.character_id,
            QuestCommandKind::Complete {
                quest_id: p.quest_id,
                start_next: p.start_next,
            },
        ),
        Action::SetQuestProgress(p) => (
            p.character_id,
            QuestCommandKind::SetProgress {
                quest_id: p.quest_id,
                info_number: p.info_number,
                progress: p.progress.clone(),
            },
        ),
        _ => return None,
    };
    Some(QuestCommand {
        transaction_id: origin.transaction_id,
        character_id,
        correlation_id: origin.correlation_id.clone(),
        kind,
    })
}

/// Topic of the external service owning `action`.
pub fn service_topic(action: &Action) -> Option<Topic> {
    use Action::*;
    let topic = match action {
        AwardExperience(_) | AwardLevel(_) | AwardMesos(_) | AwardFame(_) | ChangeJob(_)
        | ChangeHair(_) | ChangeFace(_) | ChangeSkin(_) | CreateSkill(_) | UpdateSkill(_)
        | ValidateCharacterState(_) | CreateCharacter(_) | IncreaseBuddyCapacity(_)
        | GainCloseness(_) | SetHp(_) | DeductExperience(_) | CancelAllBuffs(_)
        | ResetStats(_) | WarpToRandomPortal(_) | WarpToPortal(_)
        | ApplyConsumableEffect(_) => Topic::CommandCharacter,
        AwardCurrency(_) => Topic::CommandCashShop,
        DepositToStorage(_) | UpdateStorageMesos(_) | ShowStorage(_) => Topic::CommandStorage,
        RequestGuildName(_) | RequestGuildEmblem(_) | RequestGuildDisband(_)
        | RequestGuildCapacityIncrease(_) | CreateInvite(_) => Topic::CommandGuild,
        SpawnMonster(_) => Topic::CommandMonster,
        HitReactor(_) => Topic::CommandReactor,
        BlockPortal(_) | UnblockPortal(_) => Topic::CommandPortal,
        SendMessage(_) => Topic::CommandMessage,
        PlayPortalSound(_) | ShowInfo(_) | ShowInfoText(_) | UpdateAreaInfo(_) | ShowHint(_)
        | ShowGuideHint(_) | ShowIntro(_) => Topic::CommandSystemMessage,
        _ => return None,
    };
    Some(topic)
}
