use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::{RwLock, mpsc};

use crate::{BusError, Message, Publisher, Result, Topic};

#[derive(Default)]
struct InMemoryBusState {
    published: RwLock<Vec<Message>>,
    subscribers: RwLock<HashMap<String, Vec<mpsc::UnboundedSender<Message>>>>,
    fail_on_publish: AtomicBool,
    failures_left: AtomicUsize,
}

/// In-process bus.
///
/// Every published message is recorded and fanned out to the subscribers of
/// its topic. Used by the orchestrator binary when no external broker is
/// configured, and by tests to observe emitted commands and events.
#[derive(Clone, Default)]
pub struct InMemoryBus {
    state: Arc<InMemoryBusState>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber for `topic`.
    pub async fn subscribe(&self, topic: Topic) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .subscribers
            .write()
            .await
            .entry(topic.name())
            .or_default()
            .push(tx);
        rx
    }

    /// Configures the bus to reject publishes.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.state.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Rejects the next `count` publishes, then recovers.
    pub fn fail_next_publishes(&self, count: usize) {
        self.state.failures_left.store(count, Ordering::SeqCst);
    }

    /// Every message published so far on `topic`, oldest first.
    pub async fn messages_on(&self, topic: Topic) -> Vec<Message> {
        let name = topic.name();
        self.state
            .published
            .read()
            .await
            .iter()
            .filter(|m| m.topic == name)
            .cloned()
            .collect()
    }

    /// Decodes every message published on `topic` as `T`, skipping values of another shape.
    pub async fn decoded_on<T: DeserializeOwned>(&self, topic: Topic) -> Vec<T> {
        self.messages_on(topic)
            .await
            .iter()
            .filter_map(|m| m.decode().ok())
            .collect()
    }

    pub async fn published_count(&self) -> usize {
        self.state.published.read().await.len()
    }

    pub async fn clear(&self) {
        self.state.published.write().await.clear();
    }
}

#[async_trait]
impl Publisher for InMemoryBus {
    async fn publish(&self, messages: Vec<Message>) -> Result<()> {
        let transient = self
            .state
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient || self.state.fail_on_publish.load(Ordering::SeqCst) {
            let topic = messages.first().map(|m| m.topic.clone()).unwrap_or_default();
            return Err(BusError::Publish {
                topic,
                reason: "bus unavailable".to_string(),
            });
        }

        let mut subscribers = self.state.subscribers.write().await;
        let mut published = self.state.published.write().await;
        for message in messages {
            if let Some(senders) = subscribers.get_mut(&message.topic) {
                senders.retain(|tx| tx.send(message.clone()).is_ok());
            }
            tracing::trace!(topic = %message.topic, key = %message.key, "message published");
            published.push(message);
        }
        Ok(())
    }
}
