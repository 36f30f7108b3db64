use async_trait::async_trait;

use crate::{Message, Result};

/// Producer side of the bus.
///
/// A batch is handed over as a unit; implementations deliver every message
/// of the batch in order or report an error for the batch.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, messages: Vec<Message>) -> Result<()>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    async fn publish(&self, messages: Vec<Message>) -> Result<()> {
        (**self).publish(messages).await
    }
}
