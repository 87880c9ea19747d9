//! Backend implementations.
//!
//! This module contains concrete implementations of the [`QueueBackend`] and
//! [`NotificationBackend`] traits.
//!
//! [`QueueBackend`]: crate::backend::QueueBackend
//! [`NotificationBackend`]: crate::backend::NotificationBackend

pub mod aws;
pub mod memory;

pub use aws::{SnsBackend, SqsBackend};
pub use memory::{InMemoryBackend, InMemoryConfig, PublishedNotification};
