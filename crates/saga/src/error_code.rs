//! User-facing error codes for failed sagas.

use serde::{Deserialize, Serialize};

use crate::SagaType;

/// Reason a saga failed, as shown to the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotEnoughMesos,
    InventoryFull,
    StorageFull,
    #[default]
    Unknown,
}

impl ErrorCode {
    /// Maps the action name of the originally failed step to an error code.
    pub fn for_failure(saga_type: SagaType, failed_action: &str) -> Self {
        match saga_type {
            SagaType::StorageOperation => match failed_action {
                "award_mesos" | "update_storage_mesos" => ErrorCode::NotEnoughMesos,
                "accept_to_character" => ErrorCode::InventoryFull,
                "accept_to_storage" | "deposit_to_storage" => ErrorCode::StorageFull,
                _ => ErrorCode::Unknown,
            },
            _ => match failed_action {
                "award_asset" | "award_inventory" | "accept_to_character"
                | "create_and_equip_asset" => ErrorCode::InventoryFull,
                "award_mesos" => ErrorCode::NotEnoughMesos,
                _ => ErrorCode::Unknown,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotEnoughMesos => "not_enough_mesos",
            ErrorCode::InventoryFull => "inventory_full",
            ErrorCode::StorageFull => "storage_full",
            ErrorCode::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
