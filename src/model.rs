//! Core records of the send pipeline.
//!
//! - `SendRequest`: caller input, validated per call and discarded
//! - `DeliveryEvent`: immutable record published to the broker
//! - `SendOutcome`: closed result of one send attempt
//! - `SendResponse`: flat wire shape of an outcome for the boundary layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum message length, in characters.
pub const MAX_MESSAGE_CHARS: usize = 160;
/// Minimum number of digits in a destination.
pub const MIN_PHONE_DIGITS: usize = 10;
/// Maximum number of digits in a destination.
pub const MAX_PHONE_DIGITS: usize = 15;

/// Explanation carried by a successful outcome.
pub const SUCCESS_MESSAGE: &str = "SMS sent successfully";
/// Explanation carried by a blocked outcome.
pub const BLOCKED_MESSAGE: &str = "Phone number is in the block list";
/// Explanation carried by an outcome whose publish was not acknowledged.
pub const PUBLISH_FAILED_MESSAGE: &str = "Failed to send SMS. Please try again later.";

/// Reasons a request is rejected before any collaborator is consulted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Phone number is required")]
    MissingDestination,

    #[error("Invalid phone number format. Must be 10-15 digits.")]
    InvalidDestination,

    #[error("Message is required")]
    MissingMessage,

    #[error("Message must be between 1 and 160 characters")]
    MessageTooLong,
}

/// Caller-supplied send request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SendRequest {
    /// Destination phone number.
    #[serde(rename = "phoneNumber", alias = "destination")]
    pub destination: String,
    /// Message text.
    pub message: String,
}

impl SendRequest {
    pub fn new(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Check the request shape.
    ///
    /// Destination: optional leading `+`, first digit non-zero, 10-15 digits.
    /// Message: not blank, at most 160 characters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_destination(&self.destination)?;

        if self.message.trim().is_empty() {
            return Err(ValidationError::MissingMessage);
        }
        if self.message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ValidationError::MessageTooLong);
        }

        Ok(())
    }
}

/// Validate a destination against the international number format.
pub fn validate_destination(destination: &str) -> Result<(), ValidationError> {
    if destination.trim().is_empty() {
        return Err(ValidationError::MissingDestination);
    }

    let digits = destination.strip_prefix('+').unwrap_or(destination);
    let well_formed = digits.chars().all(|c| c.is_ascii_digit())
        && (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits.len())
        && !digits.starts_with('0');

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::InvalidDestination)
    }
}

/// Lifecycle tag of a delivery event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

/// Durable record of one send attempt.
///
/// Fields are private; the record cannot change after `pending`.
/// Serialized as camelCase JSON for downstream consumers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryEvent {
    event_id: Uuid,
    #[serde(rename = "phoneNumber")]
    destination: String,
    #[serde(rename = "message")]
    payload: String,
    status: DeliveryStatus,
    created_at: DateTime<Utc>,
}

impl DeliveryEvent {
    /// Create a pending event with a fresh id and the current time.
    pub fn pending(destination: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            destination: destination.into(),
            payload: payload.into(),
            status: DeliveryStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn status(&self) -> DeliveryStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Result of one send attempt. Exactly one per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The broker acknowledged the delivery event.
    Success {
        destination: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Validation failed or the broker did not acknowledge.
    Failed {
        destination: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// The destination is on the block list; nothing was published.
    Blocked {
        destination: String,
        timestamp: DateTime<Utc>,
    },
}

impl SendOutcome {
    pub fn success(destination: impl Into<String>) -> Self {
        Self::Success {
            destination: destination.into(),
            message: SUCCESS_MESSAGE.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            destination: destination.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn blocked(destination: impl Into<String>) -> Self {
        Self::Blocked {
            destination: destination.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn destination(&self) -> &str {
        match self {
            Self::Success { destination, .. }
            | Self::Failed { destination, .. }
            | Self::Blocked { destination, .. } => destination,
        }
    }

    /// Human-readable explanation of the outcome.
    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } | Self::Failed { message, .. } => message,
            Self::Blocked { .. } => BLOCKED_MESSAGE,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Success { timestamp, .. }
            | Self::Failed { timestamp, .. }
            | Self::Blocked { timestamp, .. } => *timestamp,
        }
    }

    pub fn status(&self) -> OutcomeStatus {
        match self {
            Self::Success { .. } => OutcomeStatus::Success,
            Self::Failed { .. } => OutcomeStatus::Failed,
            Self::Blocked { .. } => OutcomeStatus::Blocked,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Wire discriminator of an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Blocked,
}

/// Flat response shape handed to the boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub status: OutcomeStatus,
    pub message: String,
    pub phone_number: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&SendOutcome> for SendResponse {
    fn from(outcome: &SendOutcome) -> Self {
        Self {
            status: outcome.status(),
            message: outcome.message().to_string(),
            phone_number: outcome.destination().to_string(),
            timestamp: outcome.timestamp(),
        }
    }
}

impl From<SendOutcome> for SendResponse {
    fn from(outcome: SendOutcome) -> Self {
        Self::from(&outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_international_numbers() {
        for destination in ["+15551234567", "15551234567", "+1111111111", "+123456789012345"] {
            assert_eq!(validate_destination(destination), Ok(()), "{destination}");
        }
    }

    #[test]
    fn test_validate_rejects_malformed_numbers() {
        assert_eq!(
            validate_destination(""),
            Err(ValidationError::MissingDestination)
        );
        assert_eq!(
            validate_destination("   "),
            Err(ValidationError::MissingDestination)
        );
        for destination in [
            "+123456789",       // 9 digits
            "+1234567890123456", // 16 digits
            "+0123456789",      // leading zero
            "++15551234567",
            "+1555-123-4567",
            "phone",
        ] {
            assert_eq!(
                validate_destination(destination),
                Err(ValidationError::InvalidDestination),
                "{destination}"
            );
        }
    }

    #[test]
    fn test_validate_message_bounds() {
        assert_eq!(SendRequest::new("+15551234567", "hello").validate(), Ok(()));
        assert_eq!(
            SendRequest::new("+15551234567", " \t").validate(),
            Err(ValidationError::MissingMessage)
        );
        assert_eq!(
            SendRequest::new("+15551234567", "x".repeat(160)).validate(),
            Ok(())
        );
        assert_eq!(
            SendRequest::new("+15551234567", "x".repeat(161)).validate(),
            Err(ValidationError::MessageTooLong)
        );
    }

    #[test]
    fn test_message_length_counts_characters() {
        // 160 two-byte characters is still within the limit.
        let request = SendRequest::new("+15551234567", "é".repeat(160));
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn test_pending_event_fields() {
        let event = DeliveryEvent::pending("+15551234567", "hello");
        assert_eq!(event.destination(), "+15551234567");
        assert_eq!(event.payload(), "hello");
        assert_eq!(event.status(), DeliveryStatus::Pending);
        assert_ne!(
            event.event_id(),
            DeliveryEvent::pending("+15551234567", "hello").event_id()
        );
    }

    #[test]
    fn test_event_wire_format() {
        let event = DeliveryEvent::pending("+15551234567", "hello");
        let json: serde_json::Value = serde_json::from_slice(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["eventId"], event.event_id().to_string());
        assert_eq!(json["phoneNumber"], "+15551234567");
        assert_eq!(json["message"], "hello");
        assert_eq!(json["status"], "PENDING");
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn test_blocked_response_shape() {
        let response = SendResponse::from(SendOutcome::blocked("+1111111111"));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["status"], "BLOCKED");
        assert_eq!(json["message"], BLOCKED_MESSAGE);
        assert_eq!(json["phoneNumber"], "+1111111111");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn test_request_accepts_both_field_names() {
        let a: SendRequest =
            serde_json::from_str(r#"{"phoneNumber":"+15551234567","message":"hi"}"#).unwrap();
        let b: SendRequest =
            serde_json::from_str(r#"{"destination":"+15551234567","message":"hi"}"#).unwrap();
        assert_eq!(a, b);
    }
}
