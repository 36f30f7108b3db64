//! Saga persistence.
//!
//! Stores one [`SagaRecord`] per transaction. The saga body is opaque to the
//! store: the engine serializes its steps into `data` and the store only
//! tracks identity, status, deadline and the version used for optimistic
//! concurrency control.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;
pub mod version;

pub use error::{Result, SagaStoreError};
pub use memory::InMemorySagaStore;
pub use postgres::PostgresSagaStore;
pub use record::{SagaRecord, SagaStatus};
pub use store::SagaStore;
pub use version::Version;
