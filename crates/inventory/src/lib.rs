//! Compartment engine.
//!
//! Serves the asset-mutating commands emitted by saga steps: stacking
//! creation, destruction, moves and equips through the temporary slot,
//! reservations, and reference-counted transfer between character
//! inventory, account storage and the cash shop.

pub mod commands;
pub mod compartment;
pub mod consumer;
pub mod data;
pub mod engine;
pub mod error;
pub mod events;
pub mod lock;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod reservation;
pub mod slot;

pub use commands::{InventoryCommand, InventoryCommandKind};
pub use compartment::{Asset, AssetReference, Compartment, CompartmentKey, CompartmentKind};
pub use consumer::InventoryCommandHandler;
pub use data::{ItemDataProvider, StaticItemData};
pub use engine::InventoryEngine;
pub use error::{InventoryError, Result};
pub use events::{
    CompartmentStatusEvent, CompartmentStatusKind, InventoryChangeKind, InventoryChangedEvent,
};
pub use lock::LockRegistry;
pub use memory::InMemoryInventoryRepository;
pub use postgres::PostgresInventoryRepository;
pub use repository::{Change, InventoryRepository};
pub use reservation::{Reservation, ReservationRegistry};
