//! Message bus port and the publishers shipped with the engine.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors returned by an [`EventPublisher`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// The bus could not be reached at all.
    #[error("Message bus unavailable: {0}")]
    Unavailable(String),

    /// The bus refused this one message.
    #[error("Message {key} rejected: {reason}")]
    Rejected { key: String, reason: String },
}

impl PublishError {
    /// Returns true if no message can currently be delivered.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PublishError::Unavailable(_))
    }
}

/// Port to the external message bus.
///
/// `publish` returns once the bus has acknowledged the message. Messages are
/// keyed by event id so consumers can drop duplicates.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishError>;
}

/// A message accepted by the [`InMemoryEventBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    /// Parses the payload as JSON.
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.payload)
    }
}

/// In-memory message bus for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventBus {
    messages: Arc<Mutex<Vec<PublishedMessage>>>,
    rejected_keys: Arc<Mutex<HashSet<String>>>,
    fail_on_publish: Arc<AtomicBool>,
}

impl InMemoryEventBus {
    /// Creates a new in-memory bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the bus to be unreachable for every publish call.
    pub fn set_fail_on_publish(&self, fail: bool) {
        self.fail_on_publish.store(fail, Ordering::SeqCst);
    }

    /// Rejects every message published with `key` until cleared.
    pub async fn reject_key(&self, key: impl Into<String>) {
        self.rejected_keys.lock().await.insert(key.into());
    }

    /// Stops rejecting messages.
    pub async fn clear_rejections(&self) {
        self.rejected_keys.lock().await.clear();
    }

    /// Returns every acknowledged message in publish order.
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.messages.lock().await.clone()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        if self.fail_on_publish.load(Ordering::SeqCst) {
            return Err(PublishError::Unavailable("bus is down".to_string()));
        }
        if self.rejected_keys.lock().await.contains(key) {
            return Err(PublishError::Rejected {
                key: key.to_string(),
                reason: "rejected by test bus".to_string(),
            });
        }

        self.messages.lock().await.push(PublishedMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

/// Publisher that writes every message to the log.
///
/// Used by the host process when no broker is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPublisher;

#[async_trait]
impl EventPublisher for LoggingPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), PublishError> {
        tracing::info!(
            topic,
            key,
            payload = %String::from_utf8_lossy(payload),
            "message published"
        );
        Ok(())
    }
}
