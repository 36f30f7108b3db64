//! Turns script operations into single-step sagas.

use bus::{Buffer, Publisher, Topic};
use common::{CharacterId, Field, Tenant, TransactionId};
use rand::Rng;
use saga::action::{
    HitReactorPayload, ReactorDropEntry, ReactorDropType, SendMessagePayload,
    SpawnMonsterPayload, SpawnReactorDropsPayload,
};
use saga::{Action, Saga, SagaType};

use crate::script::Operation;
use crate::{ReactorError, Result};

/// The reactor an operation runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactorContext {
    pub field: Field,
    /// Object id of the reactor instance in the field.
    pub reactor_id: u32,
    pub classification: String,
    pub reactor_name: String,
    pub x: i16,
    pub y: i16,
}

/// Builds the saga for one operation. `None` for operations that have no
/// saga counterpart; those are logged and skipped.
pub fn plan(
    ctx: &ReactorContext,
    character_id: CharacterId,
    operation: &Operation,
    rng: &mut impl Rng,
) -> Result<Option<Saga>> {
    let (initiated_by, step_id, action) = match operation.operation_type.as_str() {
        "drop_items" | "spray_items" => {
            let (drop_type, drops) = roll_drops(operation, rng)?;
            if drops.is_empty() {
                tracing::debug!(reactor = %ctx.classification, "drop rolled nothing");
                return Ok(None);
            }
            (
                "reactor-action-drop",
                format!("drop-{}-{character_id}", ctx.classification),
                Action::SpawnReactorDrops(SpawnReactorDropsPayload {
                    character_id,
                    field: ctx.field,
                    reactor_id: ctx.reactor_id,
                    x: ctx.x,
                    y: ctx.y,
                    drop_type,
                    drops,
                }),
            )
        }
        "spawn_monster" => {
            let monster_id: u32 = required(operation, "spawn_monster", "monsterId")?;
            let count = optional(operation, "count").unwrap_or(1);
            (
                "reactor-action-spawn",
                format!("spawn-{}-{monster_id}", ctx.classification),
                Action::SpawnMonster(SpawnMonsterPayload {
                    character_id,
                    field: ctx.field,
                    monster_id,
                    x: optional(operation, "x").unwrap_or(ctx.x),
                    y: optional(operation, "y").unwrap_or(ctx.y),
                    team: 0,
                    count,
                }),
            )
        }
        "drop_message" => {
            let message = operation.get("message").ok_or(ReactorError::MissingParam {
                operation: "drop_message",
                param: "message",
            })?;
            let message_type = match operation.get("type") {
                None | Some("5") => "PINK_TEXT",
                Some("6") => "BLUE_TEXT",
                Some(other) => other,
            };
            (
                "reactor-action-message",
                format!("message-{character_id}"),
                Action::SendMessage(SendMessagePayload {
                    character_id,
                    world_id: ctx.field.world_id,
                    channel_id: ctx.field.channel_id,
                    message_type: message_type.to_string(),
                    message: message.to_string(),
                }),
            )
        }
        "hit_reactor" => {
            let reactor_name = operation.get("reactorName").ok_or(ReactorError::MissingParam {
                operation: "hit_reactor",
                param: "reactorName",
            })?;
            (
                "reactor-action-hit-reactor",
                format!("hit-{reactor_name}-{character_id}"),
                Action::HitReactor(HitReactorPayload {
                    character_id,
                    field: ctx.field,
                    reactor_name: reactor_name.to_string(),
                    skill_id: 0,
                }),
            )
        }
        "weaken_area_boss" | "move_environment" | "kill_all_monsters" => {
            tracing::info!(
                operation = %operation.operation_type,
                reactor = %ctx.classification,
                map_id = ctx.field.map_id,
                params = ?operation.params,
                "reactor operation has no saga action, skipped"
            );
            return Ok(None);
        }
        other => {
            tracing::warn!(operation = other, character_id, "unknown reactor operation");
            return Ok(None);
        }
    };

    let saga = Saga::builder(SagaType::InventoryTransaction, initiated_by)
        .step(step_id, action)
        .build()?;
    Ok(Some(saga))
}

/// Parses the drop list of a `drop_items`/`spray_items` operation.
///
/// `items` lists `templateId[:quantity]` entries. With `meso=true` a meso
/// pile between `mesoMin` and `mesoMax` lands with a 1 in `mesoChance`
/// chance, and `minItems` pads the result with meso piles.
fn roll_drops(
    operation: &Operation,
    rng: &mut impl Rng,
) -> Result<(ReactorDropType, Vec<ReactorDropEntry>)> {
    let drop_type = if operation.operation_type == "spray_items"
        || operation.get("dropType") == Some("spray")
    {
        ReactorDropType::Spray
    } else {
        ReactorDropType::Drop
    };

    let mut drops = Vec::new();
    if let Some(items) = operation.get("items") {
        for entry in items.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (item, quantity) = entry.split_once(':').unwrap_or((entry, "1"));
            let invalid = || ReactorError::InvalidParam {
                param: "items",
                value: entry.to_string(),
            };
            drops.push(ReactorDropEntry {
                item_id: item.trim().parse().map_err(|_| invalid())?,
                quantity: quantity.trim().parse().map_err(|_| invalid())?,
                meso: 0,
            });
        }
    }

    let meso_min: u32 = optional(operation, "mesoMin")
        .or_else(|| optional(operation, "minMeso"))
        .unwrap_or(1);
    let meso_max: u32 = optional(operation, "mesoMax")
        .or_else(|| optional(operation, "maxMeso"))
        .unwrap_or(1);
    let (low, high) = (meso_min.min(meso_max), meso_min.max(meso_max));

    if operation.get("meso") == Some("true") {
        let chance: u32 = optional(operation, "mesoChance").unwrap_or(1).max(1);
        if rng.gen_range(0..chance) == 0 {
            drops.push(meso_pile(rng, low, high));
        }
    }
    let min_items: usize = optional(operation, "minItems").unwrap_or(0);
    while drops.len() < min_items {
        drops.push(meso_pile(rng, low, high));
    }
    Ok((drop_type, drops))
}

fn meso_pile(rng: &mut impl Rng, low: u32, high: u32) -> ReactorDropEntry {
    ReactorDropEntry {
        item_id: 0,
        quantity: 0,
        meso: rng.gen_range(low..=high),
    }
}

fn required<T: std::str::FromStr>(
    operation: &Operation,
    name: &'static str,
    param: &'static str,
) -> Result<T> {
    let raw = operation.get(param).ok_or(ReactorError::MissingParam {
        operation: name,
        param,
    })?;
    raw.trim().parse().map_err(|_| ReactorError::InvalidParam {
        param,
        value: raw.to_string(),
    })
}

/// Parsed parameter; absent or malformed values yield `None`.
fn optional<T: std::str::FromStr>(operation: &Operation, param: &str) -> Option<T> {
    operation.get(param).and_then(|v| v.trim().parse().ok())
}

/// Submits the sagas planned for reactor operations on `command.saga`.
pub struct OperationExecutor<P> {
    publisher: P,
}

impl<P: Publisher> OperationExecutor<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    /// Runs `operations` in order, stopping at the first failure. Returns
    /// the transaction ids of the submitted sagas.
    #[tracing::instrument(skip(self, tenant, ctx, operations), fields(tenant_id = %tenant.id, reactor = %ctx.classification))]
    pub async fn execute_all(
        &self,
        tenant: &Tenant,
        ctx: &ReactorContext,
        character_id: CharacterId,
        operations: &[Operation],
    ) -> Result<Vec<TransactionId>> {
        let mut sagas = Vec::with_capacity(operations.len());
        {
            let mut rng = rand::thread_rng();
            for operation in operations {
                if let Some(saga) = plan(ctx, character_id, operation, &mut rng)? {
                    sagas.push(saga);
                }
            }
        }

        let mut submitted = Vec::with_capacity(sagas.len());
        for saga in sagas {
            let mut buffer = Buffer::new();
            buffer.put(Topic::CommandSaga, saga.transaction_id, tenant, &saga)?;
            buffer.emit(&self.publisher).await?;
            tracing::debug!(
                transaction_id = %saga.transaction_id,
                initiated_by = %saga.initiated_by,
                "reactor saga submitted"
            );
            submitted.push(saga.transaction_id);
        }
        Ok(submitted)
    }
}
