use chrono::{DateTime, Utc};
use common::{CharacterId, EquipmentStats, TemplateId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::{CompartmentKey, CompartmentKind};

/// Per-slot change published on `event.inventory-changed`, keyed by owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryChangedEvent {
    pub transaction_id: TransactionId,
    /// Character for inventory tabs, account for storage and cash shop.
    pub character_id: CharacterId,
    pub compartment: CompartmentKind,
    pub slot: i16,
    #[serde(flatten)]
    pub kind: InventoryChangeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum InventoryChangeKind {
    Added {
        asset_id: u32,
        template_id: TemplateId,
        quantity: u32,
        reference_id: u32,
        #[serde(default)]
        expiration: Option<DateTime<Utc>>,
    },
    QuantityUpdated {
        asset_id: u32,
        quantity: u32,
    },
    AttributeUpdated {
        asset_id: u32,
        stats: EquipmentStats,
    },
    Removed {
        asset_id: u32,
    },
    Moved {
        asset_id: u32,
        old_slot: i16,
    },
    Reserved {
        template_id: TemplateId,
        quantity: u32,
    },
    ReservationCancelled {
        template_id: TemplateId,
        quantity: u32,
    },
}

impl InventoryChangedEvent {
    pub fn new(
        transaction_id: TransactionId,
        key: CompartmentKey,
        slot: i16,
        kind: InventoryChangeKind,
    ) -> Self {
        Self {
            transaction_id,
            character_id: key.owner_id,
            compartment: key.kind,
            slot,
            kind,
        }
    }
}

/// Outcome of one inventory command, published on `event.compartment-status`
/// and keyed by owner. The saga engine correlates these to its steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentStatusEvent {
    pub transaction_id: TransactionId,
    pub character_id: CharacterId,
    pub compartment: CompartmentKind,
    /// Echo of the command's correlation id, if it carried one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub kind: CompartmentStatusKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum CompartmentStatusKind {
    Completed {
        /// Command type that completed, e.g. `CREATE_ASSET`.
        command: String,
        #[serde(default)]
        slot: Option<i16>,
        #[serde(default)]
        asset_id: Option<u32>,
        #[serde(default)]
        reference_id: Option<u32>,
    },
    Error {
        command: String,
        error_code: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use common::InventoryType;

    use super::*;

    #[test]
    fn changed_event_wire_shape() {
        let event = InventoryChangedEvent::new(
            TransactionId::new(),
            CompartmentKey::character(42, InventoryType::Equip),
            -5,
            InventoryChangeKind::Moved {
                asset_id: 9,
                old_slot: 5,
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["characterId"], 42);
        assert_eq!(json["compartment"]["inventoryType"], "equip");
        assert_eq!(json["slot"], -5);
        assert_eq!(json["type"], "MOVED");
        assert_eq!(json["body"]["oldSlot"], 5);

        let back: InventoryChangedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn status_error_carries_code() {
        let event = CompartmentStatusEvent {
            transaction_id: TransactionId::new(),
            character_id: 1,
            compartment: CompartmentKind::AccountStorage,
            correlation_id: None,
            kind: CompartmentStatusKind::Error {
                command: "ACCEPT".to_string(),
                error_code: "storage_full".to_string(),
                reason: "Compartment 1:accountStorage is full".to_string(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ERROR");
        assert_eq!(json["body"]["errorCode"], "storage_full");
        assert!(json.get("correlationId").is_none());
    }
}
