//! Delivery event publishing.
//!
//! This module contains:
//! - `EventBroker` trait: keyed write to a named channel, resolved on broker ack
//! - `EventPublisher`: one attempt, one wait, one boolean result
//! - Messaging configuration types
//! - Implementations: Channel (in-process), Kafka, Mock

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::model::DeliveryEvent;

// Implementation modules
#[cfg(feature = "channel")]
pub mod channel;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod mock;

// Re-exports
#[cfg(feature = "channel")]
pub use channel::{ChannelBroker, ChannelRecord};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaBroker, KafkaBrokerConfig};
pub use mock::{MockBroker, MockFailure};

// ============================================================================
// Traits
// ============================================================================

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors that can occur while publishing.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Publish timed out: {0}")]
    Timeout(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broker-confirmed placement of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPosition {
    pub partition: i32,
    pub offset: i64,
}

impl fmt::Display for AckPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.partition, self.offset)
    }
}

/// Broker client used by the publisher.
///
/// `send` resolves only once the broker has durably accepted the record, or
/// with an error once the client's own delivery bound expires. Records with
/// the same key land in the same partition, in send order.
///
/// Implementations:
/// - `ChannelBroker`: in-process partitioned log
/// - `KafkaBroker`: Kafka via rdkafka
/// - `MockBroker`: failure injection for testing
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// Write `event` to `channel` under `key` and wait for the ack.
    async fn send(&self, channel: &str, key: &str, event: &DeliveryEvent) -> Result<AckPosition>;
}

// ============================================================================
// Publisher
// ============================================================================

/// Publishes delivery events to one channel, keyed by destination.
///
/// `publish_sync` awaits the broker ack on the caller's task. Callers queue
/// behind a slow broker instead of reporting success early, so the success
/// rate never exceeds what the broker has actually confirmed. There is no
/// retry; a failed attempt is logged and reported as `false`.
#[derive(Clone)]
pub struct EventPublisher {
    broker: Arc<dyn EventBroker>,
    channel: String,
}

impl EventPublisher {
    pub fn new(broker: Arc<dyn EventBroker>, channel: impl Into<String>) -> Self {
        Self {
            broker,
            channel: channel.into(),
        }
    }

    /// Channel (topic) events are written to.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Publish `event` and wait for the broker to acknowledge it.
    ///
    /// Returns `true` only after an ack position is confirmed.
    pub async fn publish_sync(&self, event: &DeliveryEvent) -> bool {
        debug!(
            topic = %self.channel,
            event_id = %event.event_id(),
            phone_number = %event.destination(),
            "Sending delivery event (sync)"
        );

        match self
            .broker
            .send(&self.channel, event.destination(), event)
            .await
        {
            Ok(ack) => {
                info!(
                    topic = %self.channel,
                    event_id = %event.event_id(),
                    partition = ack.partition,
                    offset = ack.offset,
                    "Delivery event acknowledged"
                );
                true
            }
            Err(e) => {
                error!(
                    topic = %self.channel,
                    event_id = %event.event_id(),
                    phone_number = %event.destination(),
                    error = %e,
                    "Failed to publish delivery event"
                );
                false
            }
        }
    }

    /// Publish `event` on a background task and return immediately.
    ///
    /// Same single attempt as `publish_sync`; the handle resolves to its
    /// result. Dropping the handle does not cancel the publish. The send
    /// pipeline does not use this: it must not report success before the ack.
    pub fn publish_detached(&self, event: DeliveryEvent) -> JoinHandle<bool> {
        let publisher = self.clone();
        tokio::spawn(async move { publisher.publish_sync(&event).await })
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Messaging type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessagingType {
    /// In-process partitioned log.
    #[default]
    Channel,
    /// Kafka messaging.
    Kafka,
}

/// Messaging configuration (discriminated union).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Messaging type discriminator.
    #[serde(rename = "type")]
    pub messaging_type: MessagingType,
    /// Channel (topic) delivery events are published to.
    pub topic: String,
    /// Channel-specific configuration.
    pub channel: ChannelConfig,
    /// Kafka-specific configuration.
    pub kafka: KafkaConfig,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            messaging_type: MessagingType::Channel,
            topic: "sms.events".to_string(),
            channel: ChannelConfig::default(),
            kafka: KafkaConfig::default(),
        }
    }
}

/// Records the in-process broker keeps per partition unless configured.
pub const DEFAULT_CHANNEL_RETENTION: usize = 1024;

/// In-process broker configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Number of partitions per channel.
    pub partitions: i32,
    /// Most recent records kept per partition; offsets are unaffected.
    pub retention: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            partitions: 3,
            retention: DEFAULT_CHANNEL_RETENTION,
        }
    }
}

/// Kafka-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    /// Kafka bootstrap servers (comma-separated).
    pub bootstrap_servers: String,
    /// Upper bound on one publish, including broker retries (`message.timeout.ms`).
    pub message_timeout_ms: u64,
    /// Required acknowledgments (`acks`).
    pub acks: String,
    /// SASL username (optional, for authenticated clusters).
    pub sasl_username: Option<String>,
    /// SASL password (optional, for authenticated clusters).
    pub sasl_password: Option<String>,
    /// SASL mechanism (PLAIN, SCRAM-SHA-256, SCRAM-SHA-512).
    pub sasl_mechanism: Option<String>,
    /// Security protocol (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL).
    pub security_protocol: Option<String>,
    /// SSL CA certificate path (for SSL connections).
    pub ssl_ca_location: Option<String>,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            bootstrap_servers: "localhost:9092".to_string(),
            message_timeout_ms: 5000,
            acks: "all".to_string(),
            sasl_username: None,
            sasl_password: None,
            sasl_mechanism: None,
            security_protocol: None,
            ssl_ca_location: None,
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Initialize the broker client based on configuration.
///
/// Requires the corresponding feature to be enabled:
/// - Channel: `--features channel` (included in default)
/// - Kafka: `--features kafka`
pub fn init_broker(
    config: &MessagingConfig,
) -> std::result::Result<Arc<dyn EventBroker>, Box<dyn std::error::Error + Send + Sync>> {
    match config.messaging_type {
        MessagingType::Channel => {
            #[cfg(feature = "channel")]
            {
                let broker =
                    ChannelBroker::with_retention(config.channel.partitions, config.channel.retention);
                info!(messaging_type = "channel", topic = %config.topic, "Event broker initialized");
                Ok(Arc::new(broker))
            }

            #[cfg(not(feature = "channel"))]
            {
                Err("Channel broker requires the 'channel' feature. Rebuild with --features channel".into())
            }
        }
        MessagingType::Kafka => {
            #[cfg(feature = "kafka")]
            {
                let kafka_config = apply_kafka_security(
                    KafkaBrokerConfig::new(&config.kafka.bootstrap_servers)
                        .with_message_timeout_ms(config.kafka.message_timeout_ms)
                        .with_acks(&config.kafka.acks),
                    &config.kafka,
                );

                let broker = KafkaBroker::new(kafka_config)?;
                info!(messaging_type = "kafka", topic = %config.topic, "Event broker initialized");
                Ok(Arc::new(broker))
            }

            #[cfg(not(feature = "kafka"))]
            {
                Err("Kafka support requires the 'kafka' feature. Rebuild with --features kafka".into())
            }
        }
    }
}

#[cfg(feature = "kafka")]
fn apply_kafka_security(mut cfg: KafkaBrokerConfig, kafka_cfg: &KafkaConfig) -> KafkaBrokerConfig {
    if let (Some(user), Some(pass), Some(mechanism)) = (
        &kafka_cfg.sasl_username,
        &kafka_cfg.sasl_password,
        &kafka_cfg.sasl_mechanism,
    ) {
        cfg = cfg.with_sasl(user, pass, mechanism);
    }

    if let Some(ref protocol) = kafka_cfg.security_protocol {
        cfg = cfg.with_security_protocol(protocol);
    }

    if let Some(ref ca) = kafka_cfg.ssl_ca_location {
        cfg = cfg.with_ssl_ca(ca);
    }

    cfg
}
