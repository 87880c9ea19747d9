//! Error types for queue consumer operations.

use thiserror::Error;

/// Error returned by a consumer's message handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Comprehensive error type for all queue consumer operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error(
        "Queue consumer has not been configured. Call QueueRuntime::configure with the \
         access_key_id and secret_access_key before using a queue."
    )]
    NotConfigured,

    #[error("Queue consumer is already configured; call reset() before configuring again")]
    AlreadyConfigured,

    #[error("An environment must be configured before queue or topic names can be resolved")]
    EnvironmentNotSet,

    #[error("You must define the process_message method for {consumer}")]
    NotImplemented { consumer: String },

    #[error("Message handler for {queue_name} failed: {source}")]
    Handler {
        queue_name: String,
        #[source]
        source: HandlerError,
    },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl QueueError {
    /// Check if error is transient and the operation could succeed later
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Check if error comes from missing or invalid setup rather than from the backend
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NotConfigured
                | Self::AlreadyConfigured
                | Self::EnvironmentNotSet
                | Self::Configuration(_)
        )
    }
}

/// Errors reported by a queue or notification backend
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Service error: {code} - {message}")]
    Service { code: String, message: String },

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Invalid receipt handle: {0}")]
    InvalidReceipt(String),

    #[error("Message too large: {size} bytes (max: {max_size})")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("Queue {0} was deleted recently; wait 60 seconds before recreating it")]
    QueueDeletedRecently(String),

    #[error("Failed to parse backend response: {0}")]
    Serialization(String),
}

impl BackendError {
    /// Check if error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Authentication(_) => false,
            Self::Network(_) => true,
            Self::Service { .. } => true, // Most service errors are throttling or 5xx
            Self::QueueNotFound(_) => false,
            Self::TopicNotFound(_) => false,
            Self::InvalidMessage(_) => false,
            Self::InvalidReceipt(_) => false,
            Self::MessageTooLarge { .. } => false,
            Self::QueueDeletedRecently(_) => true,
            Self::Serialization(_) => false,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration parsing failed: {message}")]
    Parsing { message: String },
}

/// Validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
