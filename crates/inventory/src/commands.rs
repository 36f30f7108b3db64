use chrono::{DateTime, Utc};
use common::{CharacterId, EquipmentStats, InventoryType, TemplateId, TransactionId};
use serde::{Deserialize, Serialize};

use crate::{CompartmentKey, CompartmentKind};

/// Command consumed from `command.inventory`, keyed by character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryCommand {
    pub transaction_id: TransactionId,
    pub character_id: CharacterId,
    /// Step this command serves, echoed on the resulting status event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(flatten)]
    pub kind: InventoryCommandKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "body",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum InventoryCommandKind {
    CreateAsset {
        inventory_type: InventoryType,
        template_id: TemplateId,
        quantity: u32,
        #[serde(default)]
        expiration: Option<DateTime<Utc>>,
    },
    Destroy {
        inventory_type: InventoryType,
        template_id: TemplateId,
        quantity: u32,
        #[serde(default)]
        remove_all: bool,
    },
    DestroyFromSlot {
        inventory_type: InventoryType,
        slot: i16,
        quantity: u32,
    },
    Move {
        inventory_type: InventoryType,
        source: i16,
        destination: i16,
    },
    Equip {
        source: i16,
        #[serde(default)]
        destination: Option<i16>,
    },
    Unequip {
        source: i16,
        #[serde(default)]
        destination: Option<i16>,
    },
    Reserve {
        inventory_type: InventoryType,
        slot: i16,
        template_id: TemplateId,
        quantity: u32,
    },
    CancelReservation {
        inventory_type: InventoryType,
        slot: i16,
    },
    ConsumeReservation {
        inventory_type: InventoryType,
        slot: i16,
    },
    Accept {
        compartment: CompartmentKey,
        reference_id: u32,
        quantity: u32,
    },
    Release {
        compartment: CompartmentKey,
        asset_id: u32,
    },
    UpdateAttributes {
        slot: i16,
        stats: EquipmentStats,
    },
}

impl InventoryCommandKind {
    /// Wire name of the command type.
    pub fn name(&self) -> &'static str {
        match self {
            InventoryCommandKind::CreateAsset { .. } => "CREATE_ASSET",
            InventoryCommandKind::Destroy { .. } => "DESTROY",
            InventoryCommandKind::DestroyFromSlot { .. } => "DESTROY_FROM_SLOT",
            InventoryCommandKind::Move { .. } => "MOVE",
            InventoryCommandKind::Equip { .. } => "EQUIP",
            InventoryCommandKind::Unequip { .. } => "UNEQUIP",
            InventoryCommandKind::Reserve { .. } => "RESERVE",
            InventoryCommandKind::CancelReservation { .. } => "CANCEL_RESERVATION",
            InventoryCommandKind::ConsumeReservation { .. } => "CONSUME_RESERVATION",
            InventoryCommandKind::Accept { .. } => "ACCEPT",
            InventoryCommandKind::Release { .. } => "RELEASE",
            InventoryCommandKind::UpdateAttributes { .. } => "UPDATE_ATTRIBUTES",
        }
    }

    /// Compartment the command operates on.
    pub fn compartment(&self) -> CompartmentKind {
        use InventoryCommandKind::*;
        match self {
            CreateAsset { inventory_type, .. }
            | Destroy { inventory_type, .. }
            | DestroyFromSlot { inventory_type, .. }
            | Move { inventory_type, .. }
            | Reserve { inventory_type, .. }
            | CancelReservation { inventory_type, .. }
            | ConsumeReservation { inventory_type, .. } => {
                CompartmentKind::CharacterInventory(*inventory_type)
            }
            Equip { .. } | Unequip { .. } | UpdateAttributes { .. } => {
                CompartmentKind::CharacterInventory(InventoryType::Equip)
            }
            Accept { compartment, .. } | Release { compartment, .. } => compartment.kind,
        }
    }
}
