//! Backend client construction and caching.
//!
//! A [`ConnectionRegistry`] holds at most one queue client and one notification
//! client per runtime. Clients are built on first use through a
//! [`ConnectionFactory`] and shared by every queue and topic afterwards, until
//! the registry is reset.

use crate::backend::{NotificationBackend, QueueBackend};
use crate::config::{Configuration, ProviderConfig};
use crate::error::QueueError;
use crate::providers::{InMemoryBackend, SnsBackend, SqsBackend};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

/// Builds backend clients from a configuration
pub trait ConnectionFactory: Send + Sync {
    fn queue_backend(&self, config: &Configuration) -> Result<Arc<dyn QueueBackend>, QueueError>;

    fn notification_backend(
        &self,
        config: &Configuration,
    ) -> Result<Arc<dyn NotificationBackend>, QueueError>;

    /// Drop any state shared between the clients this factory built
    fn reset(&self) {}
}

// ============================================================================
// Provider Factory
// ============================================================================

/// Factory that builds the backend selected by [`ProviderConfig`].
///
/// With the in-memory provider both clients share one store, so notifications
/// and queues live in the same process-local backend.
#[derive(Default)]
pub struct ProviderConnectionFactory {
    in_memory: StdMutex<Option<Arc<InMemoryBackend>>>,
}

impl ProviderConnectionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    fn shared_in_memory(&self) -> Arc<InMemoryBackend> {
        let mut slot = self.in_memory.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slot.get_or_insert_with(|| Arc::new(InMemoryBackend::default())))
    }
}

impl ConnectionFactory for ProviderConnectionFactory {
    fn queue_backend(&self, config: &Configuration) -> Result<Arc<dyn QueueBackend>, QueueError> {
        match &config.provider {
            ProviderConfig::Aws(aws) => Ok(Arc::new(SqsBackend::new(aws, &config.credentials)?)),
            ProviderConfig::InMemory => Ok(self.shared_in_memory()),
        }
    }

    fn notification_backend(
        &self,
        config: &Configuration,
    ) -> Result<Arc<dyn NotificationBackend>, QueueError> {
        match &config.provider {
            ProviderConfig::Aws(aws) => Ok(Arc::new(SnsBackend::new(aws, &config.credentials)?)),
            ProviderConfig::InMemory => Ok(self.shared_in_memory()),
        }
    }

    fn reset(&self) {
        let mut slot = self.in_memory.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

impl fmt::Debug for ProviderConnectionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConnectionFactory").finish()
    }
}

/// Factory that hands out prebuilt backends regardless of configuration
#[derive(Clone)]
pub struct FixedConnections {
    queue: Arc<dyn QueueBackend>,
    notification: Arc<dyn NotificationBackend>,
}

impl FixedConnections {
    pub fn new(queue: Arc<dyn QueueBackend>, notification: Arc<dyn NotificationBackend>) -> Self {
        Self {
            queue,
            notification,
        }
    }

    /// Use one in-memory backend for both queues and notifications
    pub fn in_memory(backend: Arc<InMemoryBackend>) -> Self {
        Self {
            queue: backend.clone(),
            notification: backend,
        }
    }
}

impl ConnectionFactory for FixedConnections {
    fn queue_backend(&self, _config: &Configuration) -> Result<Arc<dyn QueueBackend>, QueueError> {
        Ok(Arc::clone(&self.queue))
    }

    fn notification_backend(
        &self,
        _config: &Configuration,
    ) -> Result<Arc<dyn NotificationBackend>, QueueError> {
        Ok(Arc::clone(&self.notification))
    }
}

impl fmt::Debug for FixedConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedConnections").finish_non_exhaustive()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Lazily built, cached backend clients
pub struct ConnectionRegistry {
    factory: Arc<dyn ConnectionFactory>,
    queue_client: Mutex<Option<Arc<dyn QueueBackend>>>,
    notification_client: Mutex<Option<Arc<dyn NotificationBackend>>>,
}

impl ConnectionRegistry {
    pub fn new(factory: Arc<dyn ConnectionFactory>) -> Self {
        Self {
            factory,
            queue_client: Mutex::new(None),
            notification_client: Mutex::new(None),
        }
    }

    /// Shared queue client, built on first use.
    ///
    /// Requires an environment tag since every queue name depends on it.
    pub async fn queue_client(
        &self,
        config: &Configuration,
    ) -> Result<Arc<dyn QueueBackend>, QueueError> {
        config.require_environment()?;

        let mut slot = self.queue_client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let client = self.factory.queue_backend(config)?;
        tracing::debug!(provider = ?config.provider, "Created queue client");
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Shared notification client, built on first use
    pub async fn notification_client(
        &self,
        config: &Configuration,
    ) -> Result<Arc<dyn NotificationBackend>, QueueError> {
        let mut slot = self.notification_client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let client = self.factory.notification_backend(config)?;
        tracing::debug!(provider = ?config.provider, "Created notification client");
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }

    /// Forget both clients so the next call builds fresh ones
    pub async fn reset(&self) {
        *self.queue_client.lock().await = None;
        *self.notification_client.lock().await = None;
        self.factory.reset();
    }
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
