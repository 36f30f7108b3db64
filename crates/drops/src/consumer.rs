use std::sync::Arc;

use async_trait::async_trait;
use bus::{BusError, Message, MessageHandler, Publisher};
use common::Origin;

use crate::{DropCommand, DropCommandKind, DropError, DropProcessor, DropRegistry};

/// Consumes `command.drop`.
///
/// Refusals are reported through status events by the processor, so only
/// infrastructure failures are handed back to the bus for redelivery.
pub struct DropCommandHandler<R, P> {
    processor: Arc<DropProcessor<R, P>>,
}

impl<R, P> DropCommandHandler<R, P> {
    pub fn new(processor: Arc<DropProcessor<R, P>>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl<R, P> MessageHandler for DropCommandHandler<R, P>
where
    R: DropRegistry + 'static,
    P: Publisher + 'static,
{
    fn name(&self) -> &'static str {
        "drop_command"
    }

    async fn handle(&self, message: &Message) -> bus::Result<()> {
        let command: DropCommand = message.decode()?;
        let tenant = message.tenant();
        let tx = command.transaction_id;
        let origin = Origin::new(tx, command.correlation_id.clone());

        let result = match command.kind {
            DropCommandKind::Spawn(body) => self
                .processor
                .spawn(&tenant, origin, body.into_builder(tx, command.field))
                .await
                .map(|_| ()),
            DropCommandKind::RequestReservation {
                drop_id,
                character_id,
                pet_slot,
                ..
            } => self
                .processor
                .reserve(&tenant, origin, command.field, drop_id, character_id, pet_slot)
                .await
                .map(|_| ()),
            DropCommandKind::CancelReservation {
                drop_id,
                character_id,
            } => {
                self.processor
                    .cancel_reservation(&tenant, origin, command.field, drop_id, character_id)
                    .await
            }
            DropCommandKind::RequestPickUp {
                drop_id,
                character_id,
            } => self
                .processor
                .gather(&tenant, origin, drop_id, character_id)
                .await
                .map(|_| ()),
            DropCommandKind::Consume { drop_id } => self.processor.consume(&tenant, drop_id).await,
        };

        match result {
            Ok(()) => Ok(()),
            Err(DropError::Bus(e)) => Err(e),
            Err(e) if e.is_transient() => Err(BusError::Handler(e.to_string())),
            Err(e) => {
                tracing::warn!(transaction_id = %tx, error = %e, "drop command rejected");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bus::{InMemoryBus, Topic};
    use common::{Field, Tenant, TenantId, TransactionId};

    use super::*;
    use crate::{DropStatusEvent, DropStatusKind, InMemoryDropRegistry, SpawnDropBody};

    fn command(kind: DropCommandKind) -> DropCommand {
        DropCommand {
            transaction_id: TransactionId::new(),
            field: Field::new(0, 1, 100000000),
            correlation_id: None,
            kind,
        }
    }

    #[tokio::test]
    async fn spawn_then_pick_up_through_commands() {
        let bus = InMemoryBus::new();
        let processor = Arc::new(DropProcessor::new(
            Arc::new(InMemoryDropRegistry::new()),
            bus.clone(),
        ));
        let handler = DropCommandHandler::new(processor.clone());
        let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);

        let spawn = command(DropCommandKind::Spawn(SpawnDropBody {
            item_id: 4000000,
            quantity: 3,
            ..SpawnDropBody::default()
        }));
        handler
            .handle(&Message::new(Topic::CommandDrop, 0, &tenant, &spawn).unwrap())
            .await
            .unwrap();

        let created: Vec<DropStatusEvent> = bus.decoded_on(Topic::EventDropStatus).await;
        let drop_id = created[0].drop_id;

        let pick_up = command(DropCommandKind::RequestPickUp {
            drop_id,
            character_id: 7,
        });
        handler
            .handle(&Message::new(Topic::CommandDrop, drop_id, &tenant, &pick_up).unwrap())
            .await
            .unwrap();

        let events: Vec<DropStatusEvent> = bus.decoded_on(Topic::EventDropStatus).await;
        assert!(matches!(events[1].kind, DropStatusKind::PickedUp(_)));
        assert!(processor.get_by_id(&tenant, drop_id).await.is_err());
    }

    #[tokio::test]
    async fn refused_reservation_is_acknowledged() {
        let bus = InMemoryBus::new();
        let processor = Arc::new(DropProcessor::new(
            Arc::new(InMemoryDropRegistry::new()),
            bus.clone(),
        ));
        let handler = DropCommandHandler::new(processor);
        let tenant = Tenant::new(TenantId::new(), "GMS", 83, 1);

        let reserve = DropCommand {
            correlation_id: Some("reserve".to_string()),
            ..command(DropCommandKind::RequestReservation {
                drop_id: 1_000_000_999,
                character_id: 1,
                party_id: 0,
                pet_slot: -1,
            })
        };
        handler
            .handle(&Message::new(Topic::CommandDrop, 0, &tenant, &reserve).unwrap())
            .await
            .unwrap();

        let events: Vec<DropStatusEvent> = bus.decoded_on(Topic::EventDropStatus).await;
        assert_eq!(
            events[0].kind,
            DropStatusKind::ReservationFailure { character_id: 1 }
        );
        assert_eq!(events[0].correlation_id.as_deref(), Some("reserve"));
    }
}
