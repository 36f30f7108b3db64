//! Saga orchestration for multi-service game transactions.
//!
//! A saga is an ordered list of steps, each one action owned by another
//! service (inventory, drops, quests, character, storage...). The engine
//! dispatches the earliest pending step as a command on the bus and
//! advances when the owning service reports back on its status topic.
//!
//! If a step fails, previously completed steps are compensated in reverse
//! order and a terminal `FAILED` status event reports the original cause.
//! Sagas are persisted with optimistic concurrency so several instances
//! can consume status events for the same saga.

pub mod action;
pub mod cache;
pub mod commands;
pub mod compensator;
pub mod consumer;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod error_code;
pub mod events;
pub mod recovery;
pub mod saga;
pub mod state;
pub mod sweeper;

pub use action::Action;
pub use cache::SagaCache;
pub use commands::{ServiceCommand, ServiceStatusEvent, ServiceStatusKind};
pub use consumer::{
    CompartmentStatusHandler, DropStatusHandler, QuestStatusHandler, SagaCommandHandler,
    ServiceStatusHandler,
};
pub use dispatcher::{Dispatch, Dispatcher, Phase, correlation_id};
pub use engine::{EngineConfig, Outcome, SagaEngine};
pub use error::{Result, SagaError};
pub use error_code::ErrorCode;
pub use events::{SagaStatusEvent, SagaStatusKind};
pub use recovery::recover;
pub use saga::{Failure, Saga, SagaBuilder, SagaType, Step, StepDetails};
pub use state::StepStatus;
pub use sweeper::{SweeperConfig, TimeoutSweeper};
