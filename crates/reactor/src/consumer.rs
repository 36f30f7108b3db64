use std::sync::Arc;

use async_trait::async_trait;
use bus::{Message, MessageHandler, Publisher};

use crate::{ReactorCommand, ReactorError, ScriptProcessor};

/// Consumes `command.reactor-actions`.
///
/// Script and parameter errors are logged and the command acked; only a
/// failed saga submission is retried.
pub struct ReactorCommandHandler<P> {
    processor: Arc<ScriptProcessor<P>>,
}

impl<P: Publisher> ReactorCommandHandler<P> {
    pub fn new(processor: Arc<ScriptProcessor<P>>) -> Self {
        Self { processor }
    }
}

#[async_trait]
impl<P: Publisher + 'static> MessageHandler for ReactorCommandHandler<P> {
    fn name(&self) -> &'static str {
        "reactor_actions_command"
    }

    async fn handle(&self, message: &Message) -> bus::Result<()> {
        let command: ReactorCommand = message.decode()?;
        let tenant = message.tenant();

        match self.processor.process(&tenant, &command).await {
            Ok(_) => Ok(()),
            Err(ReactorError::Bus(e)) => Err(e),
            Err(e) => {
                tracing::error!(
                    reactor = %command.classification,
                    character_id = command.character_id(),
                    error = %e,
                    "reactor script failed"
                );
                Ok(())
            }
        }
    }
}
