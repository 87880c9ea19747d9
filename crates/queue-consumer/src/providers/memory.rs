//! In-memory backend implementation for testing and development.
//!
//! This module provides a process-local implementation of both backend traits
//! that mirrors the behavior consumers rely on from the managed services:
//! - Idempotent queue and topic creation
//! - Long polling bounded by the requested wait time
//! - Visibility timeout: received messages reappear unless deleted
//! - Delayed delivery via `SendOptions::delay_seconds`
//! - Body validation with the same character and size rules
//! - A cooldown before a deleted queue name can be reused
//!
//! Published notifications are recorded per topic so tests can assert on them.

use crate::backend::{
    validate_message_body, NotificationBackend, QueueBackend, QueueHandle, TopicHandle,
};
use crate::error::BackendError;
use crate::message::{
    MessageId, QueueName, ReceiptHandle, ReceivedMessage, SendOptions, SentMessage, Timestamp,
    TopicName,
};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

/// Behavior knobs for the in-memory backend
#[derive(Debug, Clone)]
pub struct InMemoryConfig {
    /// How long a received message stays hidden before redelivery
    pub visibility_timeout: Duration,
    /// How long a deleted queue name stays unusable
    pub deletion_cooldown: Duration,
    /// How often a long poll re-checks an empty queue
    pub poll_interval: Duration,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(30),
            deletion_cooldown: Duration::from_secs(60),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// A notification recorded by the in-memory backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedNotification {
    pub message_id: MessageId,
    pub message: String,
    pub subject: Option<String>,
    pub published_at: Timestamp,
}

// ============================================================================
// Internal Storage Structures
// ============================================================================

#[derive(Default)]
struct Storage {
    queues: HashMap<QueueName, InMemoryQueue>,
    deleted_queues: HashMap<QueueName, Instant>,
    topics: HashMap<TopicName, InMemoryTopic>,
}

impl Storage {
    fn queue_mut(&mut self, handle: &QueueHandle) -> Result<&mut InMemoryQueue, BackendError> {
        self.queues
            .get_mut(handle.name())
            .ok_or_else(|| BackendError::QueueNotFound(handle.name().to_string()))
    }

    /// Forget deleted queue names whose cooldown has passed
    fn prune_deleted(&mut self, cooldown: Duration) {
        self.deleted_queues
            .retain(|_, deleted_at| deleted_at.elapsed() < cooldown);
    }

    fn topic_by_arn_mut(&mut self, arn: &str) -> Result<&mut InMemoryTopic, BackendError> {
        self.topics
            .values_mut()
            .find(|t| t.handle.arn() == arn)
            .ok_or_else(|| BackendError::TopicNotFound(arn.to_string()))
    }
}

struct InMemoryQueue {
    handle: QueueHandle,
    messages: VecDeque<StoredMessage>,
    in_flight: HashMap<String, InFlightMessage>,
}

impl InMemoryQueue {
    fn new(handle: QueueHandle) -> Self {
        Self {
            handle,
            messages: VecDeque::new(),
            in_flight: HashMap::new(),
        }
    }

    /// Return messages whose visibility timeout lapsed to the visible set
    fn restore_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, m)| m.visible_again_at <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(in_flight) = self.in_flight.remove(&receipt) {
                self.messages.push_back(in_flight.message);
            }
        }
    }

    fn take_available(
        &mut self,
        max_messages: usize,
        now: Instant,
        visibility_timeout: Duration,
    ) -> Vec<ReceivedMessage> {
        let mut received = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.messages.len());

        while let Some(mut stored) = self.messages.pop_front() {
            if received.len() >= max_messages || stored.available_at > now {
                remaining.push_back(stored);
                continue;
            }

            stored.receive_count += 1;
            let receipt = uuid::Uuid::new_v4().to_string();
            received.push(ReceivedMessage {
                message_id: stored.message_id.clone(),
                body: stored.body.clone(),
                receipt_handle: ReceiptHandle::new(receipt.clone()),
                attributes: stored.attributes.clone(),
                receive_count: stored.receive_count,
                received_at: Timestamp::now(),
            });
            self.in_flight.insert(
                receipt,
                InFlightMessage {
                    message: stored,
                    visible_again_at: now + visibility_timeout,
                },
            );
        }

        self.messages = remaining;
        received
    }

    fn visible_count(&self, now: Instant) -> u64 {
        let visible = self.messages.iter().filter(|m| m.available_at <= now).count();
        let expired = self
            .in_flight
            .values()
            .filter(|m| m.visible_again_at <= now)
            .count();
        (visible + expired) as u64
    }
}

#[derive(Clone)]
struct StoredMessage {
    message_id: MessageId,
    body: String,
    attributes: HashMap<String, String>,
    receive_count: u32,
    available_at: Instant,
}

struct InFlightMessage {
    message: StoredMessage,
    visible_again_at: Instant,
}

struct InMemoryTopic {
    handle: TopicHandle,
    published: Vec<PublishedNotification>,
}

// ============================================================================
// InMemoryBackend
// ============================================================================

/// In-memory queue and notification backend
pub struct InMemoryBackend {
    storage: Arc<RwLock<Storage>>,
    config: InMemoryConfig,
    unavailable: AtomicBool,
}

impl InMemoryBackend {
    /// Create new in-memory backend with configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self {
            storage: Arc::new(RwLock::new(Storage::default())),
            config,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail with a network error (or recover)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Notifications published to the named topic, oldest first
    pub fn published_notifications(&self, topic: &TopicName) -> Vec<PublishedNotification> {
        self.read()
            .ok()
            .and_then(|s| s.topics.get(topic).map(|t| t.published.clone()))
            .unwrap_or_default()
    }

    /// Names of every queue currently present
    pub fn queue_names(&self) -> Vec<QueueName> {
        self.read()
            .map(|s| s.queues.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of received-but-not-deleted messages in a queue
    pub fn in_flight_count(&self, queue: &QueueName) -> usize {
        self.read()
            .ok()
            .and_then(|s| s.queues.get(queue).map(|q| q.in_flight.len()))
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Network(
                "in-memory backend is unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Storage>, BackendError> {
        self.storage
            .read()
            .map_err(|_| BackendError::Network("in-memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Storage>, BackendError> {
        self.storage
            .write()
            .map_err(|_| BackendError::Network("in-memory storage lock poisoned".to_string()))
    }

    fn queue_url(name: &QueueName) -> String {
        format!("memory://queues/{}", name)
    }

    fn topic_arn(name: &TopicName) -> String {
        format!("arn:memory:sns:local:000000000000:{}", name)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(InMemoryConfig::default())
    }
}

#[async_trait]
impl QueueBackend for InMemoryBackend {
    async fn create_queue(&self, name: &QueueName) -> Result<QueueHandle, BackendError> {
        self.check_available()?;
        let mut storage = self.write()?;

        if let Some(queue) = storage.queues.get(name) {
            return Ok(queue.handle.clone());
        }

        storage.prune_deleted(self.config.deletion_cooldown);
        if storage.deleted_queues.contains_key(name) {
            return Err(BackendError::QueueDeletedRecently(name.to_string()));
        }

        let handle = QueueHandle::new(name.clone(), Self::queue_url(name));
        storage
            .queues
            .insert(name.clone(), InMemoryQueue::new(handle.clone()));
        Ok(handle)
    }

    async fn find_queue(&self, name: &QueueName) -> Result<QueueHandle, BackendError> {
        self.check_available()?;
        let storage = self.read()?;
        storage
            .queues
            .get(name)
            .map(|q| q.handle.clone())
            .ok_or_else(|| BackendError::QueueNotFound(name.to_string()))
    }

    async fn send_message(
        &self,
        queue: &QueueHandle,
        body: &str,
        options: &SendOptions,
    ) -> Result<SentMessage, BackendError> {
        self.check_available()?;
        validate_message_body(body)?;
        options
            .validate()
            .map_err(|e| BackendError::InvalidMessage(e.to_string()))?;

        let delay = Duration::from_secs(u64::from(options.delay_seconds.unwrap_or(0)));
        let message_id = MessageId::new();

        let mut storage = self.write()?;
        let stored_queue = storage.queue_mut(queue)?;
        stored_queue.messages.push_back(StoredMessage {
            message_id: message_id.clone(),
            body: body.to_string(),
            attributes: options.attributes.clone(),
            receive_count: 0,
            available_at: Instant::now() + delay,
        });

        Ok(SentMessage {
            message_id,
            md5_of_body: None,
        })
    }

    async fn receive_messages(
        &self,
        queue: &QueueHandle,
        max_messages: u32,
        wait_time: Duration,
    ) -> Result<Vec<ReceivedMessage>, BackendError> {
        let deadline = Instant::now() + wait_time;
        let max_messages = max_messages.clamp(1, crate::backend::MAX_RECEIVE_BATCH) as usize;

        loop {
            self.check_available()?;
            let now = Instant::now();
            let received = {
                let mut storage = self.write()?;
                let stored_queue = storage.queue_mut(queue)?;
                stored_queue.restore_expired(now);
                stored_queue.take_available(max_messages, now, self.config.visibility_timeout)
            };

            if !received.is_empty() || now >= deadline {
                return Ok(received);
            }

            let remaining = deadline - now;
            tokio::time::sleep(remaining.min(self.config.poll_interval)).await;
        }
    }

    async fn delete_message(
        &self,
        queue: &QueueHandle,
        receipt: &ReceiptHandle,
    ) -> Result<(), BackendError> {
        self.check_available()?;
        let mut storage = self.write()?;
        let stored_queue = storage.queue_mut(queue)?;

        match stored_queue.in_flight.remove(receipt.as_str()) {
            Some(_) => Ok(()),
            None => Err(BackendError::InvalidReceipt(receipt.as_str().to_string())),
        }
    }

    async fn approximate_message_count(&self, queue: &QueueHandle) -> Result<u64, BackendError> {
        self.check_available()?;
        let mut storage = self.write()?;
        let stored_queue = storage.queue_mut(queue)?;
        Ok(stored_queue.visible_count(Instant::now()))
    }

    async fn delete_queue(&self, queue: &QueueHandle) -> Result<(), BackendError> {
        self.check_available()?;
        let mut storage = self.write()?;

        if storage.queues.remove(queue.name()).is_none() {
            return Err(BackendError::QueueNotFound(queue.name().to_string()));
        }
        storage.prune_deleted(self.config.deletion_cooldown);
        storage
            .deleted_queues
            .insert(queue.name().clone(), Instant::now());
        Ok(())
    }
}

#[async_trait]
impl NotificationBackend for InMemoryBackend {
    async fn create_topic(&self, name: &TopicName) -> Result<TopicHandle, BackendError> {
        self.check_available()?;
        let mut storage = self.write()?;

        let topic = storage
            .topics
            .entry(name.clone())
            .or_insert_with(|| InMemoryTopic {
                handle: TopicHandle::new(name.clone(), Self::topic_arn(name)),
                published: Vec::new(),
            });
        Ok(topic.handle.clone())
    }

    async fn list_topics(&self) -> Result<Vec<TopicHandle>, BackendError> {
        self.check_available()?;
        let storage = self.read()?;
        Ok(storage.topics.values().map(|t| t.handle.clone()).collect())
    }

    async fn publish(
        &self,
        topic: &TopicHandle,
        message: &str,
        subject: Option<&str>,
    ) -> Result<MessageId, BackendError> {
        self.check_available()?;
        if message.is_empty() {
            return Err(BackendError::InvalidMessage(
                "notification message must not be empty".to_string(),
            ));
        }

        let mut storage = self.write()?;
        let stored_topic = storage.topic_by_arn_mut(topic.arn())?;
        let message_id = MessageId::new();
        stored_topic.published.push(PublishedNotification {
            message_id: message_id.clone(),
            message: message.to_string(),
            subject: subject.map(str::to_string),
            published_at: Timestamp::now(),
        });
        Ok(message_id)
    }

    async fn delete_topic(&self, topic: &TopicHandle) -> Result<(), BackendError> {
        self.check_available()?;
        let mut storage = self.write()?;
        // Deleting an unknown topic is a no-op at the notification service
        storage.topics.retain(|_, t| t.handle.arn() != topic.arn());
        Ok(())
    }
}
