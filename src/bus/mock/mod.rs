//! Mock event broker for testing.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AckPosition, BusError, EventBroker, Result};
use crate::model::DeliveryEvent;

/// Failure mode injected into `MockBroker::send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// The broker refuses the record.
    Reject,
    /// The ack never arrives within the client's delivery bound.
    Timeout,
}

/// Mock broker for testing.
#[derive(Default)]
pub struct MockBroker {
    published: RwLock<Vec<(String, String, DeliveryEvent)>>,
    failure: RwLock<Option<MockFailure>>,
    latency: RwLock<Option<Duration>>,
    sends: AtomicUsize,
    next_offset: AtomicI64,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failure(&self, failure: Option<MockFailure>) {
        *self.failure.write().await = failure;
    }

    /// Delay every ack by `latency`.
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().await = latency;
    }

    /// Number of send attempts, successful or not.
    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub async fn published_count(&self) -> usize {
        self.published.read().await.len()
    }

    /// Acknowledged records as `(channel, key, event)`.
    pub async fn take_published(&self) -> Vec<(String, String, DeliveryEvent)> {
        std::mem::take(&mut *self.published.write().await)
    }
}

#[async_trait]
impl EventBroker for MockBroker {
    async fn send(&self, channel: &str, key: &str, event: &DeliveryEvent) -> Result<AckPosition> {
        self.sends.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = *self.latency.read().await {
            tokio::time::sleep(latency).await;
        }

        match *self.failure.read().await {
            Some(MockFailure::Reject) => {
                return Err(BusError::Publish("Mock broker rejected record".to_string()))
            }
            Some(MockFailure::Timeout) => {
                return Err(BusError::Timeout("Mock broker did not acknowledge".to_string()))
            }
            None => {}
        }

        self.published
            .write()
            .await
            .push((channel.to_string(), key.to_string(), event.clone()));

        Ok(AckPosition {
            partition: 0,
            offset: self.next_offset.fetch_add(1, Ordering::SeqCst),
        })
    }
}
