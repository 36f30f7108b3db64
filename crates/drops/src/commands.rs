use common::{CharacterId, EquipmentStats, Field, TemplateId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::DropBuilder;

/// Command consumed from `command.drop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropCommand {
    pub transaction_id: TransactionId,
    pub field: Field,
    /// Step this command serves, echoed on the resulting status event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub kind: DropCommandKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum DropCommandKind {
    Spawn(SpawnDropBody),
    RequestReservation {
        drop_id: u32,
        character_id: CharacterId,
        #[serde(default)]
        party_id: u32,
        #[serde(default = "no_pet")]
        pet_slot: i8,
    },
    CancelReservation {
        drop_id: u32,
        character_id: CharacterId,
    },
    RequestPickUp {
        drop_id: u32,
        character_id: CharacterId,
    },
    Consume {
        drop_id: u32,
    },
}

fn no_pet() -> i8 {
    crate::model::NO_PET_SLOT
}

/// Everything needed to place a new drop; the field comes from the command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpawnDropBody {
    pub item_id: TemplateId,
    pub quantity: u32,
    pub meso: u32,
    pub drop_type: u8,
    pub x: i16,
    pub y: i16,
    pub owner_id: CharacterId,
    pub owner_party_id: u32,
    pub dropper_id: u32,
    pub dropper_x: i16,
    pub dropper_y: i16,
    pub player_drop: bool,
    pub equipment: Option<EquipmentStats>,
}

impl SpawnDropBody {
    pub fn into_builder(self, transaction_id: TransactionId, field: Field) -> DropBuilder {
        let mut builder = DropBuilder::new(transaction_id, field)
            .drop_type(self.drop_type)
            .position(self.x, self.y)
            .owner(self.owner_id, self.owner_party_id)
            .dropper(self.dropper_id, self.dropper_x, self.dropper_y)
            .player_drop(self.player_drop);
        if self.meso > 0 {
            builder = builder.meso(self.meso);
        } else {
            builder = builder.item(self.item_id, self.quantity);
        }
        if let Some(stats) = self.equipment {
            builder = builder.equipment(stats);
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_reservation_request_with_defaults() {
        let json = serde_json::json!({
            "transactionId": TransactionId::new(),
            "field": {"worldId": 0, "channelId": 1, "mapId": 100000000},
            "type": "REQUEST_RESERVATION",
            "body": {"dropId": 1000000001u32, "characterId": 12345}
        });

        let command: DropCommand = serde_json::from_value(json).unwrap();
        assert_eq!(
            command.kind,
            DropCommandKind::RequestReservation {
                drop_id: 1_000_000_001,
                character_id: 12345,
                party_id: 0,
                pet_slot: -1,
            }
        );
    }

    #[test]
    fn spawn_body_builds_meso_drop() {
        let body = SpawnDropBody {
            meso: 250,
            item_id: 0,
            ..SpawnDropBody::default()
        };
        let drop = body
            .into_builder(TransactionId::new(), Field::new(0, 1, 100000000))
            .build(1)
            .unwrap();
        assert!(drop.is_meso());
        assert_eq!(drop.meso(), 250);
    }
}
