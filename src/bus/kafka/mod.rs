//! Kafka event broker implementation.
//!
//! Delivery events are written as JSON to the configured topic.
//! Message key: destination phone number (ensures ordering per destination)

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use tracing::{debug, info};

use super::{AckPosition, BusError, EventBroker, Result};
use crate::model::DeliveryEvent;

/// How long `send` may wait for room in the local producer queue.
const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for Kafka connection.
#[derive(Clone, Debug)]
pub struct KafkaBrokerConfig {
    /// Kafka bootstrap servers (comma-separated).
    pub bootstrap_servers: String,
    /// Delivery bound for one record, including internal retries.
    pub message_timeout_ms: u64,
    /// Required acknowledgments before a write counts as delivered.
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

impl KafkaBrokerConfig {
    /// Create a producer config with durable defaults (`acks=all`, 5s bound).
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
            message_timeout_ms: 5000,
            acks: "all".to_string(),
            sasl_username: None,
            sasl_password: None,
            sasl_mechanism: None,
            security_protocol: None,
            ssl_ca_location: None,
        }
    }

    /// Set the delivery bound (`message.timeout.ms`).
    pub fn with_message_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.message_timeout_ms = timeout_ms;
        self
    }

    /// Set required acknowledgments.
    pub fn with_acks(mut self, acks: impl Into<String>) -> Self {
        self.acks = acks.into();
        self
    }

    /// Add SASL authentication.
    pub fn with_sasl(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        mechanism: impl Into<String>,
    ) -> Self {
        self.sasl_username = Some(username.into());
        self.sasl_password = Some(password.into());
        self.sasl_mechanism = Some(mechanism.into());
        self.security_protocol = Some("SASL_SSL".to_string());
        self
    }

    /// Set security protocol.
    pub fn with_security_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.security_protocol = Some(protocol.into());
        self
    }

    /// Set SSL CA certificate location.
    pub fn with_ssl_ca(mut self, ca_location: impl Into<String>) -> Self {
        self.ssl_ca_location = Some(ca_location.into());
        self
    }

    /// Build a ClientConfig for the producer.
    fn build_producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.bootstrap_servers);
        config.set("message.timeout.ms", self.message_timeout_ms.to_string());
        config.set("acks", &self.acks);
        // Idempotence requires acks=all.
        if self.acks == "all" || self.acks == "-1" {
            config.set("enable.idempotence", "true");
        }

        if let Some(ref protocol) = self.security_protocol {
            config.set("security.protocol", protocol);
        }
        if let Some(ref mechanism) = self.sasl_mechanism {
            config.set("sasl.mechanism", mechanism);
        }
        if let Some(ref username) = self.sasl_username {
            config.set("sasl.username", username);
        }
        if let Some(ref password) = self.sasl_password {
            config.set("sasl.password", password);
        }
        if let Some(ref ca_location) = self.ssl_ca_location {
            config.set("ssl.ca.location", ca_location);
        }

        config
    }
}

/// Kafka event broker.
///
/// `send` resolves with the partition and offset the broker assigned, after
/// the configured acks are in. The producer does not connect eagerly, so an
/// unreachable cluster surfaces as a failed send, not a startup error.
pub struct KafkaBroker {
    producer: FutureProducer,
    config: KafkaBrokerConfig,
}

impl KafkaBroker {
    /// Create a new Kafka broker client.
    pub fn new(config: KafkaBrokerConfig) -> Result<Self> {
        let producer: FutureProducer = config
            .build_producer_config()
            .create()
            .map_err(|e| BusError::Connection(format!("Failed to create Kafka producer: {}", e)))?;

        info!(
            bootstrap_servers = %config.bootstrap_servers,
            acks = %config.acks,
            message_timeout_ms = config.message_timeout_ms,
            "Kafka producer created"
        );

        Ok(Self { producer, config })
    }

    pub fn config(&self) -> &KafkaBrokerConfig {
        &self.config
    }

    /// Map a producer error to a bus error.
    fn classify(error: KafkaError) -> BusError {
        match error.rdkafka_error_code() {
            Some(RDKafkaErrorCode::MessageTimedOut) | Some(RDKafkaErrorCode::RequestTimedOut) => {
                BusError::Timeout(error.to_string())
            }
            _ => BusError::Publish(error.to_string()),
        }
    }
}

#[async_trait]
impl EventBroker for KafkaBroker {
    async fn send(&self, channel: &str, key: &str, event: &DeliveryEvent) -> Result<AckPosition> {
        let payload = event.to_json()?;
        let record = FutureRecord::to(channel).key(key).payload(&payload);

        let (partition, offset) = self
            .producer
            .send(record, QUEUE_TIMEOUT)
            .await
            .map_err(|(e, _)| Self::classify(e))?;

        debug!(
            topic = %channel,
            key = %key,
            partition,
            offset,
            "Published delivery event to Kafka"
        );

        Ok(AckPosition { partition, offset })
    }
}
