//! Quest engine.
//!
//! Tracks per-character quest state: starts (including chained and
//! map-triggered auto starts), completion with repeat intervals and time
//! limits, forfeits, and progress rows for mob kills and visited maps.

pub mod commands;
pub mod consumer;
pub mod definition;
pub mod engine;
pub mod error;
pub mod events;
pub mod memory;
pub mod model;
pub mod repository;

pub use commands::{QuestCommand, QuestCommandKind};
pub use consumer::QuestCommandHandler;
pub use definition::{QuestDefinition, QuestDefinitionProvider, StaticQuestDefinitions};
pub use engine::{Completion, QuestEngine};
pub use error::{QuestError, Result};
pub use events::{QuestStatusEvent, QuestStatusKind};
pub use memory::InMemoryQuestRepository;
pub use model::{QuestState, QuestStatus};
pub use repository::QuestRepository;
