use chrono::{DateTime, Utc};
use common::{CharacterId, EquipmentStats, Field, TemplateId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::Drop;

/// Status event published on `event.drop-status`, keyed by drop id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropStatusEvent {
    pub transaction_id: TransactionId,
    pub field: Field,
    pub drop_id: u32,
    /// Echo of the command's correlation id, if it carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub kind: DropStatusKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum DropStatusKind {
    Created(CreatedBody),
    Reserved(HolderBody),
    ReservationFailure { character_id: CharacterId },
    ReservationCancelled { character_id: CharacterId },
    PickedUp(HolderBody),
    Consumed,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedBody {
    pub item_id: TemplateId,
    pub quantity: u32,
    pub meso: u32,
    pub drop_type: u8,
    pub x: i16,
    pub y: i16,
    pub owner_id: CharacterId,
    pub owner_party_id: u32,
    pub drop_time: DateTime<Utc>,
    pub dropper_id: u32,
    pub dropper_x: i16,
    pub dropper_y: i16,
    pub player_drop: bool,
}

/// Body of events naming the character holding or taking the drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderBody {
    pub character_id: CharacterId,
    pub item_id: TemplateId,
    pub quantity: u32,
    pub meso: u32,
    pub pet_slot: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<EquipmentStats>,
}

impl DropStatusEvent {
    fn new(transaction_id: TransactionId, drop: &Drop, kind: DropStatusKind) -> Self {
        Self {
            transaction_id,
            field: *drop.field(),
            drop_id: drop.id(),
            correlation_id: None,
            kind,
        }
    }

    /// Tags the event with the correlation id of the command that caused it.
    pub fn correlated(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn created(transaction_id: TransactionId, drop: &Drop) -> Self {
        let (x, y) = drop.position();
        let (dropper_x, dropper_y) = drop.dropper_position();
        Self::new(
            transaction_id,
            drop,
            DropStatusKind::Created(CreatedBody {
                item_id: drop.item_id(),
                quantity: drop.quantity(),
                meso: drop.meso(),
                drop_type: drop.drop_type(),
                x,
                y,
                owner_id: drop.owner_id(),
                owner_party_id: drop.owner_party_id(),
                drop_time: drop.drop_time(),
                dropper_id: drop.dropper_id(),
                dropper_x,
                dropper_y,
                player_drop: drop.player_drop(),
            }),
        )
    }

    pub fn reserved(transaction_id: TransactionId, drop: &Drop, character_id: CharacterId) -> Self {
        Self::new(
            transaction_id,
            drop,
            DropStatusKind::Reserved(HolderBody::of(drop, character_id)),
        )
    }

    pub fn picked_up(transaction_id: TransactionId, drop: &Drop, character_id: CharacterId) -> Self {
        Self::new(
            transaction_id,
            drop,
            DropStatusKind::PickedUp(HolderBody::of(drop, character_id)),
        )
    }

    pub fn reservation_failure(
        transaction_id: TransactionId,
        field: Field,
        drop_id: u32,
        character_id: CharacterId,
    ) -> Self {
        Self {
            transaction_id,
            field,
            drop_id,
            correlation_id: None,
            kind: DropStatusKind::ReservationFailure { character_id },
        }
    }

    pub fn reservation_cancelled(
        transaction_id: TransactionId,
        field: Field,
        drop_id: u32,
        character_id: CharacterId,
    ) -> Self {
        Self {
            transaction_id,
            field,
            drop_id,
            correlation_id: None,
            kind: DropStatusKind::ReservationCancelled { character_id },
        }
    }

    pub fn consumed(drop: &Drop) -> Self {
        Self::new(drop.transaction_id(), drop, DropStatusKind::Consumed)
    }

    /// Expiry reports the transaction that created the drop.
    pub fn expired(drop: &Drop) -> Self {
        Self::new(drop.transaction_id(), drop, DropStatusKind::Expired)
    }
}

impl HolderBody {
    fn of(drop: &Drop, character_id: CharacterId) -> Self {
        Self {
            character_id,
            item_id: drop.item_id(),
            quantity: drop.quantity(),
            meso: drop.meso(),
            pet_slot: drop.pet_slot(),
            equipment: drop.equipment().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DropBuilder;

    #[test]
    fn event_wire_shape_uses_type_and_body() {
        let drop = DropBuilder::new(TransactionId::new(), Field::new(0, 1, 100000000))
            .item(2000000, 3)
            .build(1_000_000_001)
            .unwrap();
        let event = DropStatusEvent::reserved(TransactionId::new(), &drop.reserve(12345, -1), 12345)
            .correlated(Some("reserve".to_string()));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RESERVED");
        assert_eq!(json["dropId"], 1_000_000_001u32);
        assert_eq!(json["body"]["characterId"], 12345);
        assert_eq!(json["body"]["quantity"], 3);
        assert_eq!(json["correlationId"], "reserve");

        let back: DropStatusEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn expired_event_carries_creating_transaction() {
        let creator = TransactionId::new();
        let drop = DropBuilder::new(creator, Field::new(0, 1, 100000000))
            .meso(500)
            .build(9)
            .unwrap();

        let event = DropStatusEvent::expired(&drop);
        assert_eq!(event.transaction_id, creator);
        assert_eq!(event.kind, DropStatusKind::Expired);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "EXPIRED");
    }
}
