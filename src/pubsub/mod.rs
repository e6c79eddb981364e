//! Google Cloud Pub/Sub client layer.
//!
//! Everything the commands need from the messaging service sits behind two
//! traits:
//! - [`PubSubProvider`]: publish a body to a topic, run a receive loop on a
//!   subscription
//! - [`Acknowledger`]: acknowledge a delivery by its ack ID
//!
//! [`rest::RestClient`] implements both against the Pub/Sub v1 REST API. It
//! owns flow control, lease extension and pull retries, so callers only see a
//! stream of [`ReceivedMessage`] handles passed to a [`MessageHandler`].

pub mod auth;
pub mod lease;
pub mod receiver;
pub mod rest;
pub mod types;
pub mod wire;

pub use types::*;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A message as delivered by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Service-assigned message ID.
    pub id: String,
    /// Raw payload.
    pub data: Vec<u8>,
    /// Message attributes.
    pub attributes: BTreeMap<String, String>,
    /// When the service accepted the message.
    pub publish_time: DateTime<Utc>,
    /// Ordering key (empty when unordered).
    pub ordering_key: String,
}

/// Acknowledges deliveries on behalf of a [`ReceivedMessage`].
#[async_trait]
pub trait Acknowledger: Send + Sync {
    /// Acknowledge the delivery identified by `ack_id`.
    async fn acknowledge(&self, ack_id: &str) -> Result<()>;

    /// Stop holding the delivery identified by `ack_id` without
    /// acknowledging it. Its deadline is no longer extended.
    fn release(&self, _ack_id: &str) {}
}

/// A delivered message together with what is needed to acknowledge it.
#[derive(Clone)]
pub struct ReceivedMessage {
    /// Ack ID of this particular delivery.
    pub ack_id: String,
    /// The message.
    pub message: Message,
    /// Delivery attempt counter, set only when the subscription has a dead
    /// letter policy.
    pub delivery_attempt: Option<i32>,
    acker: Arc<dyn Acknowledger>,
}

impl ReceivedMessage {
    /// Create a new received message handle.
    pub fn new(
        ack_id: impl Into<String>,
        message: Message,
        delivery_attempt: Option<i32>,
        acker: Arc<dyn Acknowledger>,
    ) -> Self {
        Self {
            ack_id: ack_id.into(),
            message,
            delivery_attempt,
            acker,
        }
    }

    /// Message ID.
    pub fn id(&self) -> &str {
        &self.message.id
    }

    /// Acknowledge this delivery.
    pub async fn ack(&self) -> Result<()> {
        self.acker.acknowledge(&self.ack_id).await
    }

    /// Give up this delivery without acknowledging it.
    pub fn release(&self) {
        self.acker.release(&self.ack_id);
    }
}

impl fmt::Debug for ReceivedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceivedMessage")
            .field("ack_id", &self.ack_id)
            .field("message", &self.message)
            .field("delivery_attempt", &self.delivery_attempt)
            .finish_non_exhaustive()
    }
}

/// Callback invoked once per delivery by a receive loop.
///
/// An error stops the receive loop and is returned from
/// [`PubSubProvider::receive`].
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one delivery.
    async fn handle(&self, message: ReceivedMessage) -> Result<()>;
}

/// Minimal capability set of the messaging service.
#[async_trait]
pub trait PubSubProvider: Send + Sync {
    /// Publish one message and wait for the service-assigned ID.
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<String>;

    /// Run a receive loop on `subscription`, passing every delivery to
    /// `handler`. Runs until the loop fails or the provider ends the stream.
    async fn receive(&self, subscription: &str, handler: Arc<dyn MessageHandler>) -> Result<()>;
}
