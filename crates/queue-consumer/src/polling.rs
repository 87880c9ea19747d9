//! The receive loop.
//!
//! [`Queue::receive`] long-polls the queue, hands each message to the
//! consumer, deletes it once the handler succeeds and stops after
//! `idle_timeout` passes without any message arriving.

use crate::backend::{QueueBackend, QueueHandle, MAX_RECEIVE_BATCH};
use crate::consumer::QueueConsumer;
use crate::error::{HandlerError, QueueError};
use crate::logging::QueueLogger;
use crate::message::Timestamp;
use crate::queue::Queue;
use std::time::Duration;
use tokio::time::Instant;

/// Pause between empty polls when long polling is disabled
const EMPTY_POLL_BACKOFF: Duration = Duration::from_millis(100);

/// Settings for one run of the receive loop
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Stop after this long without receiving anything
    pub idle_timeout: Duration,
    /// Long-poll window for each receive request
    pub wait_time: Duration,
    /// Log each message's arrival and body before dispatch
    pub debug: bool,
}

impl<T: QueueConsumer> Queue<T> {
    /// Receive and process messages until the queue has been idle for
    /// `idle_timeout`.
    ///
    /// Returns the number of messages processed. A handler error stops the loop
    /// and is returned; the failing message stays on the queue.
    pub async fn receive(&self) -> Result<usize, QueueError> {
        let config = self.runtime().configuration()?;
        let queue_name = self.queue_name()?;

        config.logger().info(&format!(
            "Receiving messages for {} at {}",
            queue_name,
            Timestamp::now()
        ));

        let handle = self.queue().await?;
        let backend = self.runtime().queue_client().await?;
        let settings = PollSettings {
            idle_timeout: config.idle_timeout(),
            wait_time: config.wait_time(),
            debug: config.debug,
        };

        poll_until_idle(
            backend.as_ref(),
            &handle,
            self.consumer(),
            config.logger().as_ref(),
            settings,
        )
        .await
    }
}

/// Drive `consumer` over `queue` until it has been idle for the idle timeout
pub async fn poll_until_idle<C: QueueConsumer + ?Sized>(
    backend: &dyn QueueBackend,
    queue: &QueueHandle,
    consumer: &C,
    logger: &dyn QueueLogger,
    settings: PollSettings,
) -> Result<usize, QueueError> {
    let mut processed = 0;
    let mut last_activity = Instant::now();

    loop {
        let messages = backend
            .receive_messages(queue, MAX_RECEIVE_BATCH, settings.wait_time)
            .await?;

        if messages.is_empty() {
            if last_activity.elapsed() >= settings.idle_timeout {
                break;
            }
            if settings.wait_time.is_zero() {
                tokio::time::sleep(EMPTY_POLL_BACKOFF).await;
            }
            continue;
        }

        for message in messages {
            if settings.debug {
                logger.info(&format!(
                    "Message received for {} at {}",
                    queue.name(),
                    message.received_at
                ));
                logger.info(message.body());
            }

            if let Err(e) = consumer.process_message(&message).await {
                tracing::warn!(
                    queue = %queue.name(),
                    message_id = %message.message_id,
                    error = %e,
                    "Message handler failed; stopping receive loop"
                );
                return Err(handler_failure(queue, e));
            }

            backend
                .delete_message(queue, &message.receipt_handle)
                .await?;
            processed += 1;
        }

        last_activity = Instant::now();
    }

    tracing::info!(queue = %queue.name(), processed = processed, "Receive loop idle, stopping");
    Ok(processed)
}

/// Surface a missing handler unchanged; wrap anything else
fn handler_failure(queue: &QueueHandle, error: HandlerError) -> QueueError {
    match error.downcast::<QueueError>() {
        Ok(queue_error) => match *queue_error {
            e @ QueueError::NotImplemented { .. } => e,
            other => QueueError::Handler {
                queue_name: queue.name().to_string(),
                source: Box::new(other),
            },
        },
        Err(source) => QueueError::Handler {
            queue_name: queue.name().to_string(),
            source,
        },
    }
}

#[cfg(test)]
#[path = "polling_tests.rs"]
mod tests;
