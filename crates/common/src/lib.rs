//! Shared types threaded through every subsystem of the orchestrator.

pub mod field;
pub mod inventory;
pub mod tenant;
pub mod types;

pub use field::Field;
pub use inventory::{EquipmentStats, InventoryType, TEMPORARY_SLOT};
pub use tenant::{Tenant, TenantId};
pub use types::{Origin, TransactionId};

/// Character identifier as issued by the character service.
pub type CharacterId = u32;

/// Item template identifier from the static data service.
pub type TemplateId = u32;
