//! In-process provider used by the mode tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use pubsub_pipe::pubsub::{Acknowledger, Message, MessageHandler, PubSubProvider, ReceivedMessage};
use pubsub_pipe::{Error, Result};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Records acknowledged ack IDs.
#[derive(Default)]
pub struct RecordingAcker {
    pub acked: Mutex<Vec<String>>,
}

#[async_trait]
impl Acknowledger for RecordingAcker {
    async fn acknowledge(&self, ack_id: &str) -> Result<()> {
        self.acked.lock().unwrap().push(ack_id.to_string());
        Ok(())
    }
}

/// Provider that records publishes and replays a fixed set of deliveries.
#[derive(Default)]
pub struct FakeProvider {
    pub published: Mutex<Vec<(String, Vec<u8>)>>,
    pub deliveries: Mutex<Vec<Message>>,
    pub acker: Arc<RecordingAcker>,
    pub fail_publish: bool,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_publish: true,
            ..Self::default()
        }
    }

    pub fn with_deliveries(ids: &[&str]) -> Self {
        let provider = Self::default();
        *provider.deliveries.lock().unwrap() = ids.iter().map(|id| message(id)).collect();
        provider
    }

    pub fn published_bodies(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| String::from_utf8_lossy(body).into_owned())
            .collect()
    }

    pub fn acked(&self) -> Vec<String> {
        self.acker.acked.lock().unwrap().clone()
    }
}

#[async_trait]
impl PubSubProvider for FakeProvider {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<String> {
        if self.fail_publish {
            return Err(Error::Api {
                status: 404,
                message: format!("Resource not found (resource={})", topic),
            });
        }
        let mut published = self.published.lock().unwrap();
        published.push((topic.to_string(), data));
        Ok(format!("server-id-{}", published.len()))
    }

    async fn receive(&self, _subscription: &str, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let deliveries: Vec<Message> = self.deliveries.lock().unwrap().drain(..).collect();
        for message in deliveries {
            let ack_id = format!("ack-{}", message.id);
            let acker: Arc<dyn Acknowledger> = self.acker.clone();
            handler
                .handle(ReceivedMessage::new(ack_id, message, None, acker))
                .await?;
        }
        Ok(())
    }
}

pub fn message(id: &str) -> Message {
    let mut attributes = BTreeMap::new();
    attributes.insert("source".to_string(), "test".to_string());

    Message {
        id: id.to_string(),
        data: format!("body of {}", id).into_bytes(),
        attributes,
        publish_time: Utc::now(),
        ordering_key: String::new(),
    }
}
