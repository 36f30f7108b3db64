//! Reactor scripts.
//!
//! When a reactor is hit or triggered, its script's first matching rule
//! is selected by reactor state and each operation of that rule is
//! submitted to the saga engine as a single-step saga on `command.saga`.

pub mod commands;
pub mod consumer;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod processor;
pub mod script;

pub use commands::{ReactorCommand, ReactorCommandKind};
pub use consumer::ReactorCommandHandler;
pub use error::{ReactorError, Result};
pub use executor::{OperationExecutor, ReactorContext};
pub use processor::{Evaluation, ScriptProcessor};
pub use script::{Condition, Operation, ReactorScript, Rule, ScriptProvider, StaticScripts};
