//! Send-decision pipeline.
//!
//! `DispatchOrchestrator` runs one request through:
//! validate -> block list check -> publish with ack -> classify.
//! The pipeline has one fork (blocked or not) and one fallible leaf (publish).
//! Every path ends in exactly one `SendOutcome`; nothing escapes as an error.

use tracing::{info, warn};

use crate::blocklist::BlockListGuard;
use crate::bus::EventPublisher;
use crate::model::{DeliveryEvent, SendOutcome, SendRequest, PUBLISH_FAILED_MESSAGE};

/// Composes the block list guard and the event publisher.
///
/// Holds no per-request state, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct DispatchOrchestrator {
    guard: BlockListGuard,
    publisher: EventPublisher,
}

impl DispatchOrchestrator {
    pub fn new(guard: BlockListGuard, publisher: EventPublisher) -> Self {
        Self { guard, publisher }
    }

    /// Block list administration.
    pub fn guard(&self) -> &BlockListGuard {
        &self.guard
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    /// Decide and, if allowed, publish one send request.
    ///
    /// Returns `Blocked` without publishing when the destination is on the
    /// block list, `Success` once the broker acknowledged the delivery event,
    /// and `Failed` for malformed input or an unacknowledged publish.
    pub async fn send(&self, request: &SendRequest) -> SendOutcome {
        if let Err(e) = request.validate() {
            warn!(phone_number = %request.destination, error = %e, "Rejected malformed send request");
            return SendOutcome::failed(&request.destination, e.to_string());
        }

        if self.guard.is_blocked(&request.destination).await {
            return SendOutcome::blocked(&request.destination);
        }

        let event = DeliveryEvent::pending(&request.destination, &request.message);

        if self.publisher.publish_sync(&event).await {
            info!(
                event_id = %event.event_id(),
                phone_number = %request.destination,
                "SMS accepted for delivery"
            );
            SendOutcome::success(&request.destination)
        } else {
            SendOutcome::failed(&request.destination, PUBLISH_FAILED_MESSAGE)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::blocklist::MockBlockStore;
    use crate::bus::{MockBroker, MockFailure};
    use crate::model::{OutcomeStatus, BLOCKED_MESSAGE, SUCCESS_MESSAGE};

    struct Fixture {
        store: Arc<MockBlockStore>,
        broker: Arc<MockBroker>,
        orchestrator: DispatchOrchestrator,
    }

    fn fixture(blocked: &[&str]) -> Fixture {
        let store = Arc::new(MockBlockStore::with_members(blocked.iter().copied()));
        let broker = Arc::new(MockBroker::new());
        let orchestrator = DispatchOrchestrator::new(
            BlockListGuard::new(store.clone(), Vec::new()),
            EventPublisher::new(broker.clone(), "sms.events"),
        );
        Fixture {
            store,
            broker,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_blocked_destination_short_circuits() {
        let f = fixture(&["+1111111111"]);

        let outcome = f
            .orchestrator
            .send(&SendRequest::new("+1111111111", "hi"))
            .await;

        assert_eq!(outcome.status(), OutcomeStatus::Blocked);
        assert_eq!(outcome.destination(), "+1111111111");
        assert_eq!(outcome.message(), BLOCKED_MESSAGE);
        assert_eq!(f.broker.send_count(), 0);
    }

    #[tokio::test]
    async fn test_allowed_destination_publishes() {
        let f = fixture(&["+1111111111"]);

        let outcome = f
            .orchestrator
            .send(&SendRequest::new("+15551234567", "hello"))
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.destination(), "+15551234567");
        assert_eq!(outcome.message(), SUCCESS_MESSAGE);

        let published = f.broker.take_published().await;
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, "+15551234567");
        assert_eq!(published[0].2.payload(), "hello");
    }

    #[tokio::test]
    async fn test_publish_failure_is_failed_outcome() {
        let f = fixture(&[]);
        f.broker.set_failure(Some(MockFailure::Timeout)).await;

        let outcome = f
            .orchestrator
            .send(&SendRequest::new("+15551234567", "hello"))
            .await;

        assert_eq!(outcome.status(), OutcomeStatus::Failed);
        assert_eq!(outcome.destination(), "+15551234567");
        assert_eq!(outcome.message(), PUBLISH_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn test_malformed_request_never_reaches_collaborators() {
        let f = fixture(&[]);

        let outcome = f.orchestrator.send(&SendRequest::new("12345", "hello")).await;

        assert_eq!(outcome.status(), OutcomeStatus::Failed);
        assert_eq!(outcome.destination(), "12345");
        assert_eq!(f.store.lookup_count(), 0);
        assert_eq!(f.broker.send_count(), 0);
    }

    #[tokio::test]
    async fn test_store_outage_fails_open() {
        let f = fixture(&["+1111111111"]);
        f.store.set_unavailable(true);

        let outcome = f
            .orchestrator
            .send(&SendRequest::new("+1111111111", "hi"))
            .await;

        assert!(outcome.is_success());
        assert_eq!(f.broker.send_count(), 1);
    }
}
