//! Message bus adapter.
//!
//! Commands and status events travel as [`Message`]s: a JSON value plus
//! [`Headers`] that carry the tenant context and trace ids, keyed by the
//! natural entity key so per-entity ordering is preserved. Producers stage
//! messages in a [`Buffer`] and emit the batch once their unit of work
//! commits; consumers implement [`MessageHandler`] and are driven by
//! [`spawn_consumer`].

pub mod buffer;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod message;
pub mod publisher;
pub mod topic;

pub use buffer::Buffer;
pub use consumer::{MessageHandler, spawn_consumer};
pub use error::{BusError, Result};
pub use memory::InMemoryBus;
pub use message::{Headers, Message};
pub use publisher::Publisher;
pub use topic::Topic;
