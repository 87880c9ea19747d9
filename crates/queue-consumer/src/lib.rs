//! # Queue Consumer
//!
//! Environment-aware queue consumers over managed message-queue and pub/sub
//! notification services.
//!
//! A type implementing [`QueueConsumer`] is bound to one logical queue whose name
//! is derived from the type's name plus the configured environment tag
//! (`OrderEvents` in `staging` becomes `order_events_staging`). Wrapping it in a
//! [`Queue`] provides:
//! - Lazy, idempotent queue creation with the handle cached per queue
//! - Sending with failure logging and optional failure notifications
//! - A receive loop that long-polls, dispatches, auto-deletes and stops when idle
//! - Existence checks, approximate depth and deletion
//!
//! ## Module Organization
//!
//! - [`config`] - Configuration and its file/environment loading
//! - [`runtime`] - The configured runtime shared by queues and topics
//! - [`naming`] - Queue and topic name resolution
//! - [`connection`] - Backend client construction and caching
//! - [`consumer`], [`queue`], [`polling`] - The consumer contract and queue operations
//! - [`notification`] - Pub/sub topics used for failure alerts
//! - [`backend`], [`providers`] - Backend traits plus AWS and in-memory implementations

// Module declarations
pub mod backend;
pub mod config;
pub mod connection;
pub mod consumer;
pub mod error;
pub mod logging;
pub mod message;
pub mod naming;
pub mod notification;
pub mod polling;
pub mod providers;
pub mod queue;
pub mod runtime;

// Re-export commonly used types at crate root for convenience
pub use backend::{NotificationBackend, QueueBackend, QueueHandle, TopicHandle};
pub use config::{AwsConfig, Configuration, ConfigurationSettings, Credentials, ProviderConfig};
pub use connection::{ConnectionFactory, FixedConnections, ProviderConnectionFactory};
pub use consumer::QueueConsumer;
pub use error::{BackendError, ConfigurationError, HandlerError, QueueError, ValidationError};
pub use logging::{LogEntry, LogLevel, MemoryLogger, QueueLogger, TracingLogger};
pub use message::{
    MessageId, QueueName, ReceiptHandle, ReceivedMessage, SendOptions, SentMessage, Timestamp,
    TopicName,
};
pub use notification::{
    NotificationTopic, SEND_MESSAGE_FAILURE_SUBJECT, SEND_MESSAGE_FAILURE_TOPIC,
};
pub use providers::{InMemoryBackend, InMemoryConfig, PublishedNotification};
pub use queue::{Queue, SendFailure, SendOutcome};
pub use runtime::QueueRuntime;
