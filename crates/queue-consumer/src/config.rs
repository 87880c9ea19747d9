//! Queue consumer configuration.
//!
//! A [`Configuration`] carries everything a runtime needs: backend credentials,
//! the environment tag mixed into every queue and topic name, polling timeouts,
//! the caller-visible logger and the failure-notification switches.
//!
//! Configurations can be built programmatically or loaded from a YAML file plus
//! `QC__`-prefixed environment variables (double-underscore separator), e.g.
//! `QC__ENVIRONMENT=staging` or `QC__PROVIDER__REGION=eu-west-1`.

use crate::error::{ConfigurationError, QueueError};
use crate::logging::{QueueLogger, TracingLogger};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

/// Default seconds the polling loop waits without traffic before stopping
pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 10;

/// Default long-poll window for a single receive request
pub const DEFAULT_WAIT_TIME_SECONDS: u64 = 20;

/// Longest long-poll window the queueing service supports
pub const MAX_WAIT_TIME_SECONDS: u64 = 20;

/// Environment variable prefix used when loading settings
pub const ENV_PREFIX: &str = "QC";

// ============================================================================
// Credentials
// ============================================================================

/// Static backend credentials.
///
/// The secret is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, Default)]
pub struct Credentials {
    access_key_id: Option<String>,
    secret_access_key: Option<Zeroizing<String>>,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: Some(access_key_id.into()),
            secret_access_key: Some(Zeroizing::new(secret_access_key.into())),
        }
    }

    pub fn access_key_id(&self) -> Option<&str> {
        self.access_key_id.as_deref()
    }

    pub fn secret_access_key(&self) -> Option<&str> {
        self.secret_access_key.as_ref().map(|s| s.as_str())
    }

    /// Check whether both halves of the key pair are present
    pub fn is_complete(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// AWS SQS for queues and AWS SNS for notifications
    Aws(AwsConfig),
    /// Process-local backend for tests and development
    InMemory,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::Aws(AwsConfig::default())
    }
}

/// AWS endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
    /// Override for the SQS endpoint (e.g. a LocalStack URL)
    pub sqs_endpoint: Option<String>,
    /// Override for the SNS endpoint
    pub sns_endpoint: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            sqs_endpoint: None,
            sns_endpoint: None,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Runtime configuration for queue consumers
#[derive(Clone)]
pub struct Configuration {
    pub credentials: Credentials,
    pub environment: Option<String>,
    pub provider: ProviderConfig,
    pub idle_timeout_seconds: u64,
    pub wait_time_seconds: u64,
    pub debug: bool,
    pub notifications_enabled: bool,
    pub notification_prefix: Option<String>,
    logger: Option<Arc<dyn QueueLogger>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            environment: None,
            provider: ProviderConfig::default(),
            idle_timeout_seconds: DEFAULT_IDLE_TIMEOUT_SECONDS,
            wait_time_seconds: DEFAULT_WAIT_TIME_SECONDS,
            debug: false,
            notifications_enabled: false,
            notification_prefix: None,
            logger: None,
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from an optional YAML file and `QC__` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let settings = ConfigurationSettings::load(path)?;
        Self::from_settings(settings)
    }

    /// Build a validated configuration from deserialized settings
    pub fn from_settings(settings: ConfigurationSettings) -> Result<Self, ConfigurationError> {
        let credentials = match (settings.access_key_id, settings.secret_access_key) {
            (Some(key), Some(secret)) => Credentials::new(key, secret),
            (None, None) => Credentials::default(),
            (Some(_), None) => {
                return Err(ConfigurationError::Missing {
                    key: "secret_access_key".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigurationError::Missing {
                    key: "access_key_id".to_string(),
                })
            }
        };

        let config = Self {
            credentials,
            environment: settings.environment,
            provider: settings.provider,
            idle_timeout_seconds: settings.idle_timeout,
            wait_time_seconds: settings.wait_time_seconds,
            debug: settings.debug,
            notifications_enabled: settings.notifications_enabled,
            notification_prefix: settings.notification_prefix,
            logger: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.credentials = Credentials::new(access_key_id, secret_access_key);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    pub fn with_provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_idle_timeout(mut self, seconds: u64) -> Self {
        self.idle_timeout_seconds = seconds;
        self
    }

    pub fn with_wait_time_seconds(mut self, seconds: u64) -> Self {
        self.wait_time_seconds = seconds;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    pub fn with_notification_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.notification_prefix = Some(prefix.into());
        self
    }

    /// Route caller-visible log lines to `logger` instead of `tracing`
    pub fn with_logger(mut self, logger: impl QueueLogger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    pub fn with_shared_logger(mut self, logger: Arc<dyn QueueLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Environment tag, treating an empty string as unset
    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref().filter(|e| !e.is_empty())
    }

    /// Environment tag or [`QueueError::EnvironmentNotSet`]
    pub fn require_environment(&self) -> Result<&str, QueueError> {
        self.environment().ok_or(QueueError::EnvironmentNotSet)
    }

    /// Notification prefix, treating an empty string as unset
    pub fn notification_prefix(&self) -> Option<&str> {
        self.notification_prefix.as_deref().filter(|p| !p.is_empty())
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_seconds)
    }

    /// Configured logger, or the default tracing logger
    pub fn logger(&self) -> Arc<dyn QueueLogger> {
        match &self.logger {
            Some(logger) => Arc::clone(logger),
            None => Arc::new(TracingLogger),
        }
    }

    pub fn has_custom_logger(&self) -> bool {
        self.logger.is_some()
    }

    /// Check settings against backend limits
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.wait_time_seconds > MAX_WAIT_TIME_SECONDS {
            return Err(ConfigurationError::Invalid {
                message: format!(
                    "wait_time_seconds must be at most {} (got {})",
                    MAX_WAIT_TIME_SECONDS, self.wait_time_seconds
                ),
            });
        }

        if let ProviderConfig::Aws(aws) = &self.provider {
            if aws.region.is_empty() {
                return Err(ConfigurationError::Missing {
                    key: "provider.region".to_string(),
                });
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("credentials", &self.credentials)
            .field("environment", &self.environment)
            .field("provider", &self.provider)
            .field("idle_timeout_seconds", &self.idle_timeout_seconds)
            .field("wait_time_seconds", &self.wait_time_seconds)
            .field("debug", &self.debug)
            .field("notifications_enabled", &self.notifications_enabled)
            .field("notification_prefix", &self.notification_prefix)
            .field("custom_logger", &self.logger.is_some())
            .finish()
    }
}

// ============================================================================
// Serialized Settings
// ============================================================================

/// File/environment representation of [`Configuration`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationSettings {
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub environment: Option<String>,
    pub provider: ProviderConfig,
    /// Seconds without traffic before the polling loop stops
    pub idle_timeout: u64,
    pub wait_time_seconds: u64,
    pub debug: bool,
    pub notifications_enabled: bool,
    pub notification_prefix: Option<String>,
}

impl Default for ConfigurationSettings {
    fn default() -> Self {
        Self {
            access_key_id: None,
            secret_access_key: None,
            environment: None,
            provider: ProviderConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT_SECONDS,
            wait_time_seconds: DEFAULT_WAIT_TIME_SECONDS,
            debug: false,
            notifications_enabled: false,
            notification_prefix: None,
        }
    }
}

impl ConfigurationSettings {
    /// Load settings from an optional YAML file, then `QC__` environment variables.
    ///
    /// Later sources override earlier ones. A missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigurationError::Parsing {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
