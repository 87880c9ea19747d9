//! Pub/sub notification topics.
//!
//! A [`NotificationTopic`] wraps one backend topic whose full name is derived
//! from a base name, the optional notification prefix and the environment (see
//! [`resolve_topic_name`]). Queues publish to the [`SEND_MESSAGE_FAILURE_TOPIC`]
//! when an enqueue fails and notifications are enabled.

use crate::backend::{NotificationBackend, TopicHandle};
use crate::error::QueueError;
use crate::message::{MessageId, TopicName};
use crate::naming::resolve_topic_name;
use crate::runtime::QueueRuntime;
use std::fmt;
use std::sync::Arc;

/// Base name of the topic that receives send-failure alerts
pub const SEND_MESSAGE_FAILURE_TOPIC: &str = "send_message_failure";

/// Subject used for send-failure alerts
pub const SEND_MESSAGE_FAILURE_SUBJECT: &str = "Send Message Failure";

/// A topic that exists at the notification backend
#[derive(Clone)]
pub struct NotificationTopic {
    backend: Arc<dyn NotificationBackend>,
    handle: TopicHandle,
}

impl NotificationTopic {
    /// Find an existing topic by base name
    pub async fn find(runtime: &QueueRuntime, base: &str) -> Result<Option<Self>, QueueError> {
        let name = Self::topic_name(runtime, base)?;
        Self::find_by_full_name(runtime, name.as_str()).await
    }

    /// Find an existing topic by its full backend name
    pub async fn find_by_full_name(
        runtime: &QueueRuntime,
        full_name: &str,
    ) -> Result<Option<Self>, QueueError> {
        let backend = runtime.notification_client().await?;
        let handle = backend
            .list_topics()
            .await?
            .into_iter()
            .find(|topic| topic.name().as_str() == full_name);

        Ok(handle.map(|handle| Self { backend, handle }))
    }

    /// Create the topic for `base`, or fetch it if it already exists
    pub async fn create(runtime: &QueueRuntime, base: &str) -> Result<Self, QueueError> {
        let name = Self::topic_name(runtime, base)?;
        Self::create_named(runtime, &name).await
    }

    /// Create a topic with an already-resolved full name
    pub async fn create_with_full_name(
        runtime: &QueueRuntime,
        full_name: &str,
    ) -> Result<Self, QueueError> {
        let name = TopicName::new(full_name.to_string())?;
        Self::create_named(runtime, &name).await
    }

    /// Full topic name for `base` under the runtime's prefix and environment
    pub fn topic_name(runtime: &QueueRuntime, base: &str) -> Result<TopicName, QueueError> {
        let config = runtime.configuration()?;
        resolve_topic_name(base, config.notification_prefix(), config.environment())
    }

    async fn create_named(runtime: &QueueRuntime, name: &TopicName) -> Result<Self, QueueError> {
        let backend = runtime.notification_client().await?;
        let handle = backend.create_topic(name).await?;
        Ok(Self { backend, handle })
    }

    pub fn name(&self) -> &TopicName {
        self.handle.name()
    }

    pub fn arn(&self) -> &str {
        self.handle.arn()
    }

    pub fn handle(&self) -> &TopicHandle {
        &self.handle
    }

    /// Publish `message` to every subscriber of the topic
    pub async fn send(&self, message: &str, subject: Option<&str>) -> Result<MessageId, QueueError> {
        let id = self.backend.publish(&self.handle, message, subject).await?;
        tracing::debug!(topic = %self.name(), message_id = %id, "Published notification");
        Ok(id)
    }

    /// Delete the topic at the backend
    pub async fn delete(self) -> Result<(), QueueError> {
        self.backend.delete_topic(&self.handle).await?;
        Ok(())
    }
}

impl fmt::Debug for NotificationTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationTopic")
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
