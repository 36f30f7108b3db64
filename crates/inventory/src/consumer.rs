use std::sync::Arc;

use async_trait::async_trait;
use bus::{Buffer, BusError, Message, MessageHandler, Publisher, Topic};
use common::Tenant;

use crate::{
    CompartmentStatusEvent, CompartmentStatusKind, InventoryCommand,
    InventoryCommandKind, InventoryEngine, InventoryError, InventoryRepository,
};

#[derive(Debug, Default)]
struct Outcome {
    slot: Option<i16>,
    asset_id: Option<u32>,
    reference_id: Option<u32>,
}

/// Consumes `command.inventory` and reports each outcome on
/// `event.compartment-status`.
pub struct InventoryCommandHandler<R, P> {
    engine: Arc<InventoryEngine<R, P>>,
}

impl<R, P> InventoryCommandHandler<R, P>
where
    R: InventoryRepository,
    P: Publisher,
{
    pub fn new(engine: Arc<InventoryEngine<R, P>>) -> Self {
        Self { engine }
    }

    async fn execute(
        &self,
        tenant: &Tenant,
        command: &InventoryCommand,
    ) -> Result<Outcome, InventoryError> {
        let engine = &self.engine;
        let tx = command.transaction_id;
        let character_id = command.character_id;

        let outcome = match command.kind.clone() {
            InventoryCommandKind::CreateAsset {
                inventory_type,
                template_id,
                quantity,
                expiration,
            } => {
                let assets = engine
                    .create_asset(tenant, tx, character_id, inventory_type, template_id, quantity, expiration)
                    .await?;
                let first = assets.first();
                Outcome {
                    slot: first.map(|a| a.slot),
                    asset_id: first.map(|a| a.id),
                    reference_id: first.map(|a| a.reference_id),
                }
            }
            InventoryCommandKind::Destroy {
                inventory_type,
                template_id,
                quantity,
                remove_all,
            } => {
                engine
                    .destroy_asset(tenant, tx, character_id, inventory_type, template_id, quantity, remove_all)
                    .await?;
                Outcome::default()
            }
            InventoryCommandKind::DestroyFromSlot {
                inventory_type,
                slot,
                quantity,
            } => {
                engine
                    .destroy_asset_from_slot(tenant, tx, character_id, inventory_type, slot, quantity)
                    .await?;
                Outcome {
                    slot: Some(slot),
                    ..Outcome::default()
                }
            }
            InventoryCommandKind::Move {
                inventory_type,
                source,
                destination,
            } => {
                engine
                    .move_asset(tenant, tx, character_id, inventory_type, source, destination)
                    .await?;
                Outcome {
                    slot: Some(destination),
                    ..Outcome::default()
                }
            }
            InventoryCommandKind::Equip {
                source,
                destination,
            } => Outcome {
                slot: Some(engine.equip(tenant, tx, character_id, source, destination).await?),
                ..Outcome::default()
            },
            InventoryCommandKind::Unequip {
                source,
                destination,
            } => Outcome {
                slot: Some(engine.unequip(tenant, tx, character_id, source, destination).await?),
                ..Outcome::default()
            },
            InventoryCommandKind::Reserve {
                inventory_type,
                slot,
                template_id,
                quantity,
            } => {
                engine
                    .reserve(tenant, tx, character_id, inventory_type, slot, template_id, quantity)
                    .await?;
                Outcome {
                    slot: Some(slot),
                    ..Outcome::default()
                }
            }
            InventoryCommandKind::CancelReservation {
                inventory_type,
                slot,
            } => {
                engine
                    .cancel_reservation(tenant, tx, character_id, inventory_type, slot)
                    .await?;
                Outcome {
                    slot: Some(slot),
                    ..Outcome::default()
                }
            }
            InventoryCommandKind::ConsumeReservation {
                inventory_type,
                slot,
            } => {
                engine
                    .consume_reservation(tenant, tx, character_id, inventory_type, slot)
                    .await?;
                Outcome {
                    slot: Some(slot),
                    ..Outcome::default()
                }
            }
            InventoryCommandKind::Accept {
                compartment,
                reference_id,
                quantity,
            } => {
                let asset = engine
                    .accept(tenant, tx, compartment, reference_id, quantity)
                    .await?;
                Outcome {
                    slot: Some(asset.slot),
                    asset_id: Some(asset.id),
                    reference_id: Some(asset.reference_id),
                }
            }
            InventoryCommandKind::Release {
                compartment,
                asset_id,
            } => {
                let asset = engine.release(tenant, tx, compartment, asset_id).await?;
                Outcome {
                    slot: Some(asset.slot),
                    asset_id: Some(asset.id),
                    reference_id: Some(asset.reference_id),
                }
            }
            InventoryCommandKind::UpdateAttributes { slot, stats } => {
                engine
                    .update_equipment_stats(tenant, tx, character_id, slot, stats)
                    .await?;
                Outcome {
                    slot: Some(slot),
                    ..Outcome::default()
                }
            }
        };
        Ok(outcome)
    }
}

#[async_trait]
impl<R, P> MessageHandler for InventoryCommandHandler<R, P>
where
    R: InventoryRepository + 'static,
    P: Publisher + 'static,
{
    fn name(&self) -> &'static str {
        "inventory_command"
    }

    async fn handle(&self, message: &Message) -> bus::Result<()> {
        let command: InventoryCommand = message.decode()?;
        let tenant = message.tenant();
        let name = command.kind.name();
        metrics::counter!("inventory_commands_total", "command" => name).increment(1);

        let kind = match self.execute(&tenant, &command).await {
            Ok(outcome) => CompartmentStatusKind::Completed {
                command: name.to_string(),
                slot: outcome.slot,
                asset_id: outcome.asset_id,
                reference_id: outcome.reference_id,
            },
            Err(InventoryError::Bus(e)) => return Err(e),
            Err(e) if e.is_transient() => return Err(BusError::Handler(e.to_string())),
            Err(e) => {
                metrics::counter!("inventory_command_failures_total", "command" => name)
                    .increment(1);
                tracing::warn!(
                    transaction_id = %command.transaction_id,
                    character_id = command.character_id,
                    command = name,
                    error = %e,
                    "inventory command failed"
                );
                CompartmentStatusKind::Error {
                    command: name.to_string(),
                    error_code: e.code().to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let status = CompartmentStatusEvent {
            transaction_id: command.transaction_id,
            character_id: command.character_id,
            compartment: command.kind.compartment(),
            correlation_id: command.correlation_id.clone(),
            kind,
        };
        let mut buffer = Buffer::new();
        buffer.put(Topic::EventCompartmentStatus, command.character_id, &tenant, &status)?;
        buffer.emit(self.engine.publisher()).await
    }
}

#[cfg(test)]
mod tests {
    use bus::InMemoryBus;
    use common::{InventoryType, TenantId, TransactionId};

    use super::*;
    use crate::{
        InMemoryInventoryRepository, LockRegistry, ReservationRegistry, StaticItemData,
    };

    fn handler() -> (
        InventoryCommandHandler<InMemoryInventoryRepository, InMemoryBus>,
        InMemoryBus,
    ) {
        let bus = InMemoryBus::new();
        let engine = InventoryEngine::new(
            Arc::new(InMemoryInventoryRepository::new()),
            bus.clone(),
            Arc::new(StaticItemData::new()),
            LockRegistry::new(),
            ReservationRegistry::new(),
        );
        (InventoryCommandHandler::new(Arc::new(engine)), bus)
    }

    fn message(tenant: &Tenant, command: &InventoryCommand) -> Message {
        Message::new(Topic::CommandInventory, command.character_id, tenant, command).unwrap()
    }

    #[tokio::test]
    async fn completed_status_reports_created_slot() {
        let (handler, bus) = handler();
        let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);
        let tx = TransactionId::new();
        let command = InventoryCommand {
            transaction_id: tx,
            character_id: 12345,
            correlation_id: Some("award".to_string()),
            kind: InventoryCommandKind::CreateAsset {
                inventory_type: InventoryType::Use,
                template_id: 1000000,
                quantity: 10,
                expiration: None,
            },
        };

        handler.handle(&message(&tenant, &command)).await.unwrap();

        let statuses: Vec<CompartmentStatusEvent> =
            bus.decoded_on(Topic::EventCompartmentStatus).await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].transaction_id, tx);
        assert_eq!(statuses[0].correlation_id.as_deref(), Some("award"));
        assert!(matches!(
            statuses[0].kind,
            CompartmentStatusKind::Completed { slot: Some(1), .. }
        ));
        assert_eq!(bus.messages_on(Topic::EventInventoryChanged).await.len(), 1);
    }

    #[tokio::test]
    async fn domain_failure_becomes_error_status() {
        let (handler, bus) = handler();
        let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);
        let command = InventoryCommand {
            transaction_id: TransactionId::new(),
            character_id: 1,
            correlation_id: None,
            kind: InventoryCommandKind::Unequip {
                source: -11,
                destination: None,
            },
        };

        handler.handle(&message(&tenant, &command)).await.unwrap();

        let statuses: Vec<CompartmentStatusEvent> =
            bus.decoded_on(Topic::EventCompartmentStatus).await;
        assert!(matches!(
            &statuses[0].kind,
            CompartmentStatusKind::Error { error_code, command, .. }
                if error_code == "asset_not_found" && command == "UNEQUIP"
        ));
        assert!(statuses[0].correlation_id.is_none());
        assert!(bus.messages_on(Topic::EventInventoryChanged).await.is_empty());
    }
}
