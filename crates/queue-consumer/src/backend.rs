//! Backend capability traits for the queueing and notification services.
//!
//! Queue and topic handles are plain values naming a backend resource; the
//! backends themselves hold the connection state. Implementations live under
//! [`crate::providers`].

use crate::error::BackendError;
use crate::message::{
    MessageId, QueueName, ReceiptHandle, ReceivedMessage, SendOptions, SentMessage, TopicName,
};
use async_trait::async_trait;
use std::time::Duration;

/// Most messages a single receive request may return
pub const MAX_RECEIVE_BATCH: u32 = 10;

/// Largest message body accepted by the queueing service
pub const MAX_MESSAGE_SIZE: usize = 256 * 1024;

/// Reference to a queue that exists at the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    name: QueueName,
    url: String,
}

impl QueueHandle {
    pub fn new(name: QueueName, url: String) -> Self {
        Self { name, url }
    }

    pub fn name(&self) -> &QueueName {
        &self.name
    }

    /// Backend address of the queue
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Reference to a notification topic that exists at the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicHandle {
    name: TopicName,
    arn: String,
}

impl TopicHandle {
    pub fn new(name: TopicName, arn: String) -> Self {
        Self { name, arn }
    }

    pub fn name(&self) -> &TopicName {
        &self.name
    }

    /// Backend identifier of the topic
    pub fn arn(&self) -> &str {
        &self.arn
    }
}

/// Operations of a managed message-queue service
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Create the queue, or return the existing one with the same name
    async fn create_queue(&self, name: &QueueName) -> Result<QueueHandle, BackendError>;

    /// Look up an existing queue by name
    async fn find_queue(&self, name: &QueueName) -> Result<QueueHandle, BackendError>;

    /// Enqueue a message body
    async fn send_message(
        &self,
        queue: &QueueHandle,
        body: &str,
        options: &SendOptions,
    ) -> Result<SentMessage, BackendError>;

    /// Long-poll for up to `max_messages`, waiting at most `wait_time`
    async fn receive_messages(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>, BackendError>;

    /// Remove a received message so it is not redelivered
    async fn delete_message(
        &self,
        queue: &QueueHandle,
        receipt: &ReceiptHandle,
    ) -> Result<(), BackendError>;

    /// Approximate number of visible messages (eventually consistent)
    async fn approximate_message_count(&self, queue: &QueueHandle) -> Result<u64, BackendError>;

    /// Delete the queue and every message in it
    async fn delete_queue(&self, queue: &QueueHandle) -> Result<(), BackendError>;
}

/// Operations of a managed pub/sub notification service
#[async_trait]
pub trait NotificationBackend: Send + Sync {
    /// Create the topic, or return the existing one with the same name
    async fn create_topic(&self, name: &TopicName) -> Result<TopicHandle, BackendError>;

    /// List every topic visible to the configured account
    async fn list_topics(&self) -> Result<Vec<TopicHandle>, BackendError>;

    /// Publish a message to the topic's subscribers
    async fn publish(
        &self,
        topic: &TopicHandle,
        message: &str,
        subject: Option<&str>,
    ) -> Result<MessageId, BackendError>;

    async fn delete_topic(&self, topic: &TopicHandle) -> Result<(), BackendError>;
}

/// Check a body against the character and size rules of the queueing service.
///
/// Allowed characters are `#x9 | #xA | #xD | #x20-#xD7FF | #xE000-#xFFFD |
/// #x10000-#x10FFFF`; the body must be non-empty.
pub fn validate_message_body(body: &str) -> Result<(), BackendError> {
    if body.is_empty() {
        return Err(BackendError::InvalidMessage(
            "message body must not be empty".to_string(),
        ));
    }

    if body.len() > MAX_MESSAGE_SIZE {
        return Err(BackendError::MessageTooLarge {
            size: body.len(),
            max_size: MAX_MESSAGE_SIZE,
        });
    }

    if let Some(c) = body.chars().find(|c| !is_allowed_body_char(*c)) {
        return Err(BackendError::InvalidMessage(format!(
            "message body contains invalid character U+{:04X}",
            c as u32
        )));
    }

    Ok(())
}

fn is_allowed_body_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bodies_pass() {
        assert!(validate_message_body("test message").is_ok());
        assert!(validate_message_body("{\"id\": 1}\n\ttabbed").is_ok());
        assert!(validate_message_body("emoji \u{1F600}").is_ok());
    }

    #[test]
    fn test_empty_body_is_rejected() {
        assert!(matches!(
            validate_message_body(""),
            Err(BackendError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_control_characters_are_rejected() {
        let err = validate_message_body("bad\u{0}body").unwrap_err();
        assert!(err.to_string().contains("U+0000"));
    }

    #[test]
    fn test_oversized_body_is_rejected() {
        let body = "a".repeat(MAX_MESSAGE_SIZE + 1);
        assert!(matches!(
            validate_message_body(&body),
            Err(BackendError::MessageTooLarge { .. })
        ));
    }
}
