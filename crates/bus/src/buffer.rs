use common::Tenant;
use serde::Serialize;

use crate::{Message, Publisher, Result, Topic};

/// Messages staged by a unit of work, emitted only after it succeeds.
///
/// Dropping a buffer without calling [`Buffer::emit`] discards the batch,
/// which is how failed operations end up emitting nothing.
#[derive(Debug, Default)]
pub struct Buffer {
    messages: Vec<Message>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes and stages a message.
    pub fn put<T: Serialize>(
        &mut self,
        topic: Topic,
        key: impl ToString,
        tenant: &Tenant,
        body: &T,
    ) -> Result<()> {
        self.messages.push(Message::new(topic, key, tenant, body)?);
        Ok(())
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Publishes the staged batch. An empty buffer publishes nothing.
    pub async fn emit<P: Publisher + ?Sized>(self, publisher: &P) -> Result<()> {
        if self.messages.is_empty() {
            return Ok(());
        }
        publisher.publish(self.messages).await
    }
}
