//! The consumer contract.
//!
//! A consumer type names its queue and handles the messages pulled from it.
//! Wrap it in a [`Queue`](crate::queue::Queue) to send to and receive from that
//! queue.
//!
//! ```
//! use async_trait::async_trait;
//! use queue_consumer::{HandlerError, QueueConsumer, ReceivedMessage};
//!
//! struct OrderEvents;
//!
//! #[async_trait]
//! impl QueueConsumer for OrderEvents {
//!     async fn process_message(&self, message: &ReceivedMessage) -> Result<(), HandlerError> {
//!         println!("order event: {}", message.body());
//!         Ok(())
//!     }
//! }
//!
//! assert_eq!(OrderEvents.consumer_name(), "OrderEvents");
//! ```

use crate::error::{HandlerError, QueueError};
use crate::message::ReceivedMessage;
use crate::naming::type_base_name;
use async_trait::async_trait;

/// A message handler bound to one logical queue
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    /// Identity the queue name is derived from.
    ///
    /// Defaults to the implementing type's name without module path. Names may
    /// use `::` nesting, which becomes `_` in the queue name.
    fn consumer_name(&self) -> String {
        type_base_name::<Self>().to_string()
    }

    /// Base queue name that replaces the one derived from [`consumer_name`].
    ///
    /// [`consumer_name`]: QueueConsumer::consumer_name
    fn queue_name_override(&self) -> Option<String> {
        None
    }

    /// Handle one received message.
    ///
    /// Returning `Ok` deletes the message from the queue. Returning an error
    /// stops the receive loop and leaves the message for redelivery.
    async fn process_message(&self, _message: &ReceivedMessage) -> Result<(), HandlerError> {
        Err(Box::new(QueueError::NotImplemented {
            consumer: self.consumer_name(),
        }))
    }
}
