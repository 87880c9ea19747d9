//! Message types for queue operations including core domain identifiers.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Longest queue name accepted by the queueing service
pub const MAX_QUEUE_NAME_LENGTH: usize = 80;

/// Longest topic name accepted by the notification service
pub const MAX_TOPIC_NAME_LENGTH: usize = 256;

/// Largest delay the queueing service accepts for a single message
pub const MAX_DELAY_SECONDS: u32 = 900;

// ============================================================================
// Core Domain Identifiers
// ============================================================================

/// Validated queue name with length and character restrictions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueName(String);

impl QueueName {
    /// Create new queue name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        validate_resource_name("queue_name", &name, MAX_QUEUE_NAME_LENGTH)?;
        Ok(Self(name))
    }

    /// Get queue name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for QueueName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Validated notification topic name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicName(String);

impl TopicName {
    /// Create new topic name with validation
    pub fn new(name: String) -> Result<Self, ValidationError> {
        validate_resource_name("topic_name", &name, MAX_TOPIC_NAME_LENGTH)?;
        Ok(Self(name))
    }

    /// Get topic name as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TopicName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

fn validate_resource_name(field: &str, name: &str, max_len: usize) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > max_len {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            message: format!("must be 1-{} characters", max_len),
        });
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            message: "only ASCII alphanumeric, hyphens, and underscores allowed".to_string(),
        });
    }

    Ok(())
}

/// Identifier assigned to a message by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(String);

impl MessageId {
    /// Generate new random message ID
    pub fn new() -> Self {
        let id = uuid::Uuid::new_v4();
        Self(id.to_string())
    }

    /// Get message ID as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "message_id".to_string(),
            });
        }

        Ok(Self(s.to_string()))
    }
}

/// Timestamp wrapper for consistent time handling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current time
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Create timestamp from DateTime
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

// ============================================================================
// Message Types
// ============================================================================

/// Opaque token used to delete a received message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(String);

impl ReceiptHandle {
    /// Create new receipt handle
    pub fn new(handle: String) -> Self {
        Self(handle)
    }

    /// Get handle string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A message received from the queue with backend metadata.
///
/// The body is treated as opaque; consumers decide how to decode it.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: MessageId,
    pub body: String,
    pub receipt_handle: ReceiptHandle,
    pub attributes: HashMap<String, String>,
    /// Approximate number of times the backend has delivered this message
    pub receive_count: u32,
    pub received_at: Timestamp,
}

impl ReceivedMessage {
    /// Get the message body
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Check if this delivery is a redelivery of an earlier receive
    pub fn is_redelivery(&self) -> bool {
        self.receive_count > 1
    }
}

/// Acknowledgement returned by the backend for an enqueued message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub message_id: MessageId,
    /// MD5 digest of the body as computed by the backend, when reported
    pub md5_of_body: Option<String>,
}

/// Options for sending messages to queues
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Seconds to delay delivery (0-900)
    pub delay_seconds: Option<u32>,
    /// String message attributes forwarded with the message
    pub attributes: HashMap<String, String>,
}

impl SendOptions {
    /// Create new send options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set delivery delay in seconds
    pub fn with_delay_seconds(mut self, delay_seconds: u32) -> Self {
        self.delay_seconds = Some(delay_seconds);
        self
    }

    /// Add a message attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Check option values against backend limits
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(delay) = self.delay_seconds {
            if delay > MAX_DELAY_SECONDS {
                return Err(ValidationError::OutOfRange {
                    field: "delay_seconds".to_string(),
                    message: format!("must be 0-{}", MAX_DELAY_SECONDS),
                });
            }
        }

        if self.attributes.keys().any(|k| k.is_empty()) {
            return Err(ValidationError::Required {
                field: "attribute name".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
