//! Queue handles for consumer types.
//!
//! [`Queue<T>`] binds a [`QueueConsumer`] to a [`QueueRuntime`]. The backend
//! queue is created on first use and its handle cached for the lifetime of the
//! `Queue` value (or until [`Queue::delete_queue`]).

use crate::backend::QueueHandle;
use crate::consumer::QueueConsumer;
use crate::error::{BackendError, QueueError};
use crate::logging::QueueLogger;
use crate::message::{QueueName, SendOptions, SentMessage, Timestamp};
use crate::naming::resolve_queue_name;
use crate::notification::{
    NotificationTopic, SEND_MESSAGE_FAILURE_SUBJECT, SEND_MESSAGE_FAILURE_TOPIC,
};
use crate::runtime::QueueRuntime;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Result of [`Queue::send`]
#[derive(Debug)]
pub enum SendOutcome {
    Sent(SentMessage),
    /// The backend rejected the message; the failure was logged
    Failed(SendFailure),
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }

    pub fn sent(&self) -> Option<&SentMessage> {
        match self {
            Self::Sent(sent) => Some(sent),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&SendFailure> {
        match self {
            Self::Sent(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }
}

/// Details of a send the backend did not accept
#[derive(Debug)]
pub struct SendFailure {
    pub queue_name: QueueName,
    pub error: QueueError,
    /// Whether the failure alert reached the notification topic
    pub notified: bool,
}

/// A consumer bound to its backend queue
pub struct Queue<T: QueueConsumer> {
    consumer: T,
    runtime: Arc<QueueRuntime>,
    name_override: Option<String>,
    handle: Mutex<Option<QueueHandle>>,
}

impl<T: QueueConsumer> Queue<T> {
    pub fn new(runtime: Arc<QueueRuntime>, consumer: T) -> Self {
        Self {
            consumer,
            runtime,
            name_override: None,
            handle: Mutex::new(None),
        }
    }

    /// Use `base` instead of the consumer-derived base name
    pub fn with_queue_name(mut self, base: impl Into<String>) -> Self {
        self.name_override = Some(base.into());
        self
    }

    pub fn consumer(&self) -> &T {
        &self.consumer
    }

    pub fn runtime(&self) -> &Arc<QueueRuntime> {
        &self.runtime
    }

    /// Environment-qualified queue name
    pub fn queue_name(&self) -> Result<QueueName, QueueError> {
        let config = self.runtime.configuration()?;
        let base_override = self
            .name_override
            .clone()
            .or_else(|| self.consumer.queue_name_override());

        resolve_queue_name(
            &self.consumer.consumer_name(),
            base_override.as_deref(),
            config.environment(),
        )
    }

    /// Backend queue, created on first use.
    ///
    /// A cached handle whose name no longer matches the resolved queue name
    /// (the runtime was reconfigured for another environment) is discarded.
    pub async fn queue(&self) -> Result<QueueHandle, QueueError> {
        let name = self.queue_name()?;
        let mut cached = self.handle.lock().await;
        if let Some(handle) = cached.as_ref() {
            if handle.name() == &name {
                return Ok(handle.clone());
            }
            tracing::debug!(
                stale = %handle.name(),
                queue = %name,
                "Dropping stale queue handle"
            );
            *cached = None;
        }

        let backend = self.runtime.queue_client().await?;
        let handle = backend.create_queue(&name).await?;

        tracing::debug!(queue = %name, url = %handle.url(), "Queue ready");
        *cached = Some(handle.clone());
        Ok(handle)
    }

    /// Check whether the queue exists at the backend.
    ///
    /// Any failure, including configuration and transient backend errors, is
    /// reported as `false`.
    pub async fn exists(&self) -> bool {
        let lookup = async {
            let name = self.queue_name()?;
            let backend = self.runtime.queue_client().await?;
            backend.find_queue(&name).await?;
            Ok::<_, QueueError>(())
        };

        match lookup.await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Queue lookup failed");
                false
            }
        }
    }

    /// Approximate number of visible messages
    pub async fn count(&self) -> Result<u64, QueueError> {
        let handle = self.queue().await?;
        let backend = self.runtime.queue_client().await?;
        Ok(backend.approximate_message_count(&handle).await?)
    }

    /// Delete the backend queue and forget the cached handle.
    ///
    /// Never creates the queue. Deleting a queue that does not exist succeeds.
    /// The backend may refuse to recreate a queue with the same name for about
    /// a minute afterwards.
    pub async fn delete_queue(&self) -> Result<(), QueueError> {
        let name = self.queue_name()?;
        let backend = self.runtime.queue_client().await?;
        let mut cached = self.handle.lock().await;

        let handle = match cached.take().filter(|h| h.name() == &name) {
            Some(handle) => handle,
            None => match backend.find_queue(&name).await {
                Ok(handle) => handle,
                Err(BackendError::QueueNotFound(_)) => {
                    tracing::debug!(queue = %name, "Queue already absent");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            },
        };

        match backend.delete_queue(&handle).await {
            Ok(()) => {
                tracing::info!(queue = %name, "Deleted queue");
                Ok(())
            }
            Err(BackendError::QueueNotFound(_)) => {
                tracing::debug!(queue = %name, "Queue already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Send a message body with default options
    pub async fn send(&self, body: &str) -> Result<SendOutcome, QueueError> {
        self.send_with_options(body, &SendOptions::default()).await
    }

    /// Send a message body.
    ///
    /// Backend failures do not produce `Err`: they are logged, optionally
    /// broadcast to the send-failure topic, and returned as
    /// [`SendOutcome::Failed`]. Missing configuration or environment is
    /// returned as `Err`.
    pub async fn send_with_options(
        &self,
        body: &str,
        options: &SendOptions,
    ) -> Result<SendOutcome, QueueError> {
        let config = self.runtime.configuration()?;
        let queue_name = self.queue_name()?;

        let error = match self.try_send(body, options).await {
            Ok(sent) => {
                tracing::debug!(queue = %queue_name, message_id = %sent.message_id, "Sent message");
                return Ok(SendOutcome::Sent(sent));
            }
            Err(e) if e.is_configuration_error() => return Err(e),
            Err(e) => e,
        };

        let line = format!(
            "There was an error when sending an item to {} at {}. Error: {}",
            queue_name,
            Timestamp::now(),
            error
        );
        let logger = config.logger();
        logger.error(&line);

        let notified = if config.notifications_enabled {
            self.notify_send_failure(&line, logger.as_ref()).await
        } else {
            false
        };

        Ok(SendOutcome::Failed(SendFailure {
            queue_name,
            error,
            notified,
        }))
    }

    async fn try_send(&self, body: &str, options: &SendOptions) -> Result<SentMessage, QueueError> {
        let handle = self.queue().await?;
        let backend = self.runtime.queue_client().await?;
        Ok(backend.send_message(&handle, body, options).await?)
    }

    async fn notify_send_failure(&self, line: &str, logger: &dyn QueueLogger) -> bool {
        let published = async {
            let topic = NotificationTopic::create(&self.runtime, SEND_MESSAGE_FAILURE_TOPIC).await?;
            topic.send(line, Some(SEND_MESSAGE_FAILURE_SUBJECT)).await
        };

        match published.await {
            Ok(_) => true,
            Err(e) => {
                logger.error(&format!(
                    "Unable to publish to the {} notification topic. Error: {}",
                    SEND_MESSAGE_FAILURE_TOPIC, e
                ));
                false
            }
        }
    }

    /// Configured logger, or the default tracing logger
    pub fn logger(&self) -> Arc<dyn QueueLogger> {
        self.runtime.logger()
    }
}

impl<T: QueueConsumer + fmt::Debug> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("consumer", &self.consumer)
            .field("name_override", &self.name_override)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
