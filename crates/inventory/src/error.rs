use common::TemplateId;
use thiserror::Error;

use crate::{CompartmentKey, CompartmentKind};

/// Errors raised by the compartment engine.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("No asset in slot {slot} of {key}")]
    AssetNotFound { key: CompartmentKey, slot: i16 },

    #[error("Asset {asset_id} not found in {key}")]
    AssetIdNotFound { key: CompartmentKey, asset_id: u32 },

    #[error("Compartment {0} is full")]
    CompartmentFull(CompartmentKey),

    #[error("Not enough of template {template_id}: requested {requested}, available {available}")]
    NotEnoughQuantity {
        template_id: TemplateId,
        requested: u32,
        available: u32,
    },

    #[error("Slot {slot} is already reserved")]
    SlotReserved { slot: i16 },

    #[error("No reservation on slot {slot} for this transaction")]
    ReservationNotFound { slot: i16 },

    #[error("Invalid slot {0}")]
    InvalidSlot(i16),

    #[error("Template {0} cannot be equipped")]
    NotEquipable(TemplateId),

    #[error("Template {template_id} does not belong in {key}")]
    WrongCompartment {
        template_id: TemplateId,
        key: CompartmentKey,
    },

    #[error("Asset reference {0} not found")]
    ReferenceNotFound(u32),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt inventory data: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bus error: {0}")]
    Bus(#[from] bus::BusError),
}

impl InventoryError {
    /// Code reported on compartment status events.
    pub fn code(&self) -> &'static str {
        match self {
            InventoryError::CompartmentFull(key) => match key.kind {
                CompartmentKind::AccountStorage => "storage_full",
                _ => "inventory_full",
            },
            InventoryError::NotEnoughQuantity { .. } => "not_enough_quantity",
            InventoryError::SlotReserved { .. } => "slot_reserved",
            InventoryError::AssetNotFound { .. }
            | InventoryError::AssetIdNotFound { .. }
            | InventoryError::ReservationNotFound { .. }
            | InventoryError::ReferenceNotFound(_) => "asset_not_found",
            InventoryError::InvalidSlot(_)
            | InventoryError::NotEquipable(_)
            | InventoryError::WrongCompartment { .. } => "invalid_request",
            _ => "unknown",
        }
    }

    /// Infrastructure failures worth redelivering.
    pub fn is_transient(&self) -> bool {
        matches!(self, InventoryError::Database(_) | InventoryError::Bus(_))
    }
}

/// Result type for inventory operations.
pub type Result<T> = std::result::Result<T, InventoryError>;

#[cfg(test)]
mod tests {
    use common::InventoryType;

    use super::*;

    #[test]
    fn full_storage_maps_to_storage_full() {
        let storage = InventoryError::CompartmentFull(CompartmentKey::storage(1));
        let tab = InventoryError::CompartmentFull(CompartmentKey::character(1, InventoryType::Use));
        assert_eq!(storage.code(), "storage_full");
        assert_eq!(tab.code(), "inventory_full");
    }
}
