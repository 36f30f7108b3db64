//! Drop lifecycle.
//!
//! Ground drops are spawned onto a map, reserved by a character (or pet)
//! attempting a pickup, then gathered, consumed or expired. The registry is
//! shared by every orchestrator instance in production ([`RedisDropRegistry`]);
//! [`InMemoryDropRegistry`] serves single-process deployments and tests.

pub mod commands;
pub mod consumer;
pub mod error;
pub mod events;
pub mod expiration;
pub mod memory;
pub mod model;
pub mod processor;
pub mod redis_registry;
pub mod registry;

pub use commands::{DropCommand, DropCommandKind, SpawnDropBody};
pub use consumer::DropCommandHandler;
pub use error::{DropError, Result};
pub use events::{DropStatusEvent, DropStatusKind};
pub use expiration::DropExpirationTask;
pub use memory::InMemoryDropRegistry;
pub use model::{Drop, DropBuilder, DropStatus};
pub use processor::DropProcessor;
pub use redis_registry::RedisDropRegistry;
pub use registry::{DropRegistry, IdRange};
