use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{Message, Result};

/// Attempts per message before a failing delivery is dropped.
const MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// Consumer side of the bus.
///
/// Delivery is at-least-once, so handlers must be idempotent. Returning an
/// error signals a transient failure and the message is redelivered; domain
/// failures are expected to be converted into status events instead.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn handle(&self, message: &Message) -> Result<()>;
}

/// Drives `handler` with every message received on `rx` until the channel closes.
pub fn spawn_consumer<H>(handler: Arc<H>, mut rx: mpsc::UnboundedReceiver<Message>) -> JoinHandle<()>
where
    H: MessageHandler + ?Sized + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            deliver(handler.as_ref(), &message).await;
        }
        tracing::debug!(consumer = handler.name(), "consumer stopped");
    })
}

async fn deliver<H: MessageHandler + ?Sized>(handler: &H, message: &Message) {
    let mut attempt = 1;
    loop {
        match handler.handle(message).await {
            Ok(()) => return,
            Err(e) if attempt < MAX_DELIVERY_ATTEMPTS => {
                tracing::warn!(
                    consumer = handler.name(),
                    topic = %message.topic,
                    attempt,
                    error = %e,
                    "message handling failed, redelivering"
                );
                tokio::time::sleep(Duration::from_millis(10 * u64::from(attempt))).await;
                attempt += 1;
            }
            Err(e) => {
                metrics::counter!("bus_messages_dropped_total", "consumer" => handler.name())
                    .increment(1);
                tracing::error!(
                    consumer = handler.name(),
                    topic = %message.topic,
                    key = %message.key,
                    error = %e,
                    "message dropped after repeated failures"
                );
                return;
            }
        }
    }
}
