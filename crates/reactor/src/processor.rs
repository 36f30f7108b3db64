use std::sync::Arc;

use bus::Publisher;
use common::{Tenant, TransactionId};

use crate::commands::{ReactorCommand, ReactorCommandKind};
use crate::evaluator::first_match;
use crate::executor::{OperationExecutor, ReactorContext};
use crate::script::{Operation, ScriptProvider};
use crate::Result;

/// What a reactor event resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// The reactor has no script.
    NoScript,
    /// No rule matched the reactor state.
    NoMatch,
    Matched {
        rule_id: String,
        operations: Vec<Operation>,
    },
}

/// Runs reactor scripts: picks the first matching rule for a hit or
/// trigger and submits its operations as sagas.
pub struct ScriptProcessor<P> {
    scripts: Arc<dyn ScriptProvider>,
    executor: OperationExecutor<P>,
}

impl<P: Publisher> ScriptProcessor<P> {
    pub fn new(scripts: Arc<dyn ScriptProvider>, publisher: P) -> Self {
        Self {
            scripts,
            executor: OperationExecutor::new(publisher),
        }
    }

    /// Resolves an event against the reactor's hit rules (`hit = true`)
    /// or act rules.
    pub fn evaluate(&self, reactor_id: &str, reactor_state: i8, hit: bool) -> Result<Evaluation> {
        let Some(script) = self.scripts.script(reactor_id) else {
            tracing::debug!(reactor_id, "no reactor script");
            return Ok(Evaluation::NoScript);
        };
        let rules = if hit {
            &script.hit_rules
        } else {
            &script.act_rules
        };
        Ok(match first_match(reactor_state, rules)? {
            Some(rule) => Evaluation::Matched {
                rule_id: rule.id.clone(),
                operations: rule.operations.clone(),
            },
            None => Evaluation::NoMatch,
        })
    }

    /// Handles a reactor command end to end. Returns the submitted sagas.
    #[tracing::instrument(skip(self, tenant, command), fields(tenant_id = %tenant.id, reactor = %command.classification))]
    pub async fn process(&self, tenant: &Tenant, command: &ReactorCommand) -> Result<Vec<TransactionId>> {
        let hit = matches!(command.kind, ReactorCommandKind::Hit { .. });
        let event = if hit { "hit" } else { "trigger" };
        let character_id = command.character_id();

        let Evaluation::Matched {
            rule_id,
            operations,
        } = self.evaluate(&command.classification, command.reactor_state, hit)?
        else {
            return Ok(Vec::new());
        };
        metrics::counter!("reactor_rules_matched_total", "event" => event).increment(1);
        tracing::debug!(
            rule_id,
            character_id,
            event,
            operations = operations.len(),
            "reactor rule matched"
        );

        let ctx = ReactorContext {
            field: command.field(),
            reactor_id: command.reactor_id,
            classification: command.classification.clone(),
            reactor_name: command.reactor_name.clone(),
            x: command.x,
            y: command.y,
        };
        self.executor
            .execute_all(tenant, &ctx, character_id, &operations)
            .await
    }
}
