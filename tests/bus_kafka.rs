//! Kafka broker integration tests using testcontainers.
//!
//! Run with: cargo test --test bus_kafka --features kafka -- --nocapture
//!
//! Uses Redpanda (Kafka-compatible, no Zookeeper) for a fast startup.

#![cfg(feature = "kafka")]

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::ClientConfig;
use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    GenericImage, ImageExt,
};

use sms_sender::blocklist::{BlockListGuard, MemoryBlockStore};
use sms_sender::bus::{EventBroker, EventPublisher, KafkaBroker, KafkaBrokerConfig};
use sms_sender::model::OutcomeStatus;
use sms_sender::{DeliveryEvent, DispatchOrchestrator, SendRequest};

/// Generates a unique port in the ephemeral range for testing.
fn generate_test_port() -> u16 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos()
        .hash(&mut hasher);

    29000 + (hasher.finish() % 1000) as u16
}

/// Start Redpanda with the advertised listener matching a fixed host port.
///
/// Clients learn broker addresses from metadata, so the advertised address
/// must be reachable from the host, not just the bootstrap connection.
async fn start_kafka() -> (testcontainers::ContainerAsync<GenericImage>, String) {
    let host_port = generate_test_port();
    let advertised_addr = format!("localhost:{}", host_port);

    let image = GenericImage::new("redpandadata/redpanda", "v24.1.1")
        .with_wait_for(WaitFor::message_on_stderr("Successfully started Redpanda"));

    let container = image
        .with_mapped_port(host_port, ContainerPort::Tcp(9092))
        .with_cmd([
            "redpanda",
            "start",
            "--mode",
            "dev-container",
            "--smp",
            "1",
            "--memory",
            "512M",
            "--overprovisioned",
            "--kafka-addr",
            "0.0.0.0:9092",
            "--advertise-kafka-addr",
            &advertised_addr,
        ])
        .with_startup_timeout(Duration::from_secs(120))
        .start()
        .await
        .expect("Failed to start Redpanda container");

    tokio::time::sleep(Duration::from_secs(3)).await;

    (container, advertised_addr)
}

fn test_topic() -> String {
    format!("sms.events.test-{}", uuid::Uuid::new_v4().simple())
}

fn consumer(bootstrap_servers: &str, topic: &str) -> StreamConsumer {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", bootstrap_servers)
        .set("group.id", format!("test-{}", uuid::Uuid::new_v4()))
        .set("auto.offset.reset", "earliest")
        .set("enable.auto.commit", "false")
        .create()
        .expect("Failed to create consumer");
    consumer.subscribe(&[topic]).expect("Failed to subscribe");
    consumer
}

#[tokio::test]
async fn test_kafka_send_returns_ack_position() {
    let (_container, bootstrap_servers) = start_kafka().await;
    let topic = test_topic();

    let broker = KafkaBroker::new(KafkaBrokerConfig::new(&bootstrap_servers))
        .expect("Failed to create producer");

    let first = DeliveryEvent::pending("+15551234567", "first");
    let second = DeliveryEvent::pending("+15551234567", "second");

    let a = broker
        .send(&topic, first.destination(), &first)
        .await
        .expect("First send should be acknowledged");
    let b = broker
        .send(&topic, second.destination(), &second)
        .await
        .expect("Second send should be acknowledged");

    // Same key, same partition, increasing offsets.
    assert_eq!(a.partition, b.partition);
    assert!(b.offset > a.offset);
}

#[tokio::test]
async fn test_kafka_pipeline_publishes_keyed_json() {
    let (_container, bootstrap_servers) = start_kafka().await;
    let topic = test_topic();

    let broker = Arc::new(
        KafkaBroker::new(KafkaBrokerConfig::new(&bootstrap_servers))
            .expect("Failed to create producer"),
    );
    let orchestrator = DispatchOrchestrator::new(
        BlockListGuard::new(Arc::new(MemoryBlockStore::new()), Vec::new()),
        EventPublisher::new(broker, &topic),
    );

    let outcome = orchestrator
        .send(&SendRequest::new("+15551234567", "hello"))
        .await;
    assert_eq!(outcome.status(), OutcomeStatus::Success);

    let consumer = consumer(&bootstrap_servers, &topic);
    let mut stream = consumer.stream();
    let message = tokio::time::timeout(Duration::from_secs(15), stream.next())
        .await
        .expect("Timed out waiting for message")
        .expect("Stream ended")
        .expect("Kafka error");

    assert_eq!(message.key(), Some("+15551234567".as_bytes()));
    let json: serde_json::Value =
        serde_json::from_slice(message.payload().expect("Missing payload")).unwrap();
    assert_eq!(json["phoneNumber"], "+15551234567");
    assert_eq!(json["message"], "hello");
    assert_eq!(json["status"], "PENDING");
}

#[tokio::test]
async fn test_kafka_unreachable_broker_is_failed_outcome() {
    // Nothing listens here; the delivery bound expires instead.
    let broker = Arc::new(
        KafkaBroker::new(KafkaBrokerConfig::new("localhost:1").with_message_timeout_ms(1000))
            .expect("Producer creation does not connect"),
    );
    let orchestrator = DispatchOrchestrator::new(
        BlockListGuard::new(Arc::new(MemoryBlockStore::new()), Vec::new()),
        EventPublisher::new(broker, test_topic()),
    );

    let outcome = orchestrator
        .send(&SendRequest::new("+15551234567", "hello"))
        .await;

    assert_eq!(outcome.status(), OutcomeStatus::Failed);
    assert_eq!(outcome.destination(), "+15551234567");
}
