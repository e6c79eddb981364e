//! Pub/Sub v1 REST client.
//!
//! ## Endpoints used
//! - `POST /v1/projects/{project}/topics/{topic}:publish`
//! - `POST /v1/projects/{project}/subscriptions/{subscription}:pull`
//! - `POST /v1/projects/{project}/subscriptions/{subscription}:acknowledge`
//! - `POST /v1/projects/{project}/subscriptions/{subscription}:modifyAckDeadline`

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{PubsubConfig, ReceiveConfig};
use crate::error::{Error, Result};
use crate::pubsub::auth::Auth;
use crate::pubsub::types::ResourceName;
use crate::pubsub::wire::{
    AcknowledgeRequest, Empty, ErrorResponse, ModifyAckDeadlineRequest, PublishRequest,
    PublishResponse, PubsubMessage, PullRequest, PullResponse, ReceivedMessage,
};
use crate::pubsub::{receiver, MessageHandler, PubSubProvider};

/// Authenticated handle to the Pub/Sub REST API.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    http: Client,
    base_url: String,
    project: String,
    auth: Auth,
    receive: ReceiveConfig,
}

impl RestClient {
    /// Build a client, resolving credentials unless an emulator is configured.
    pub async fn connect(config: &PubsubConfig, receive: ReceiveConfig) -> Result<Self> {
        let auth = match &config.emulator_host {
            Some(host) => {
                info!("Using Pub/Sub emulator at {}", host);
                Auth::Anonymous
            }
            None => Auth::discover(config.credentials_path.as_deref()).await?,
        };

        Self::with_auth(config, receive, auth)
    }

    /// Build a client with explicit authorization.
    pub fn with_auth(config: &PubsubConfig, receive: ReceiveConfig, auth: Auth) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(format!("pubsub-pipe/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        let base_url = config.base_url();
        debug!("Pub/Sub REST client targeting {}", base_url);

        Ok(Self {
            inner: Arc::new(RestClientInner {
                http,
                base_url,
                project: config.project_id.clone(),
                auth,
                receive,
            }),
        })
    }

    /// Project bare topic and subscription IDs are resolved against.
    pub fn project(&self) -> &str {
        &self.inner.project
    }

    /// Receive loop settings.
    pub fn receive_config(&self) -> &ReceiveConfig {
        &self.inner.receive
    }

    /// Publish a single message and return its ID.
    pub async fn publish_message(&self, topic: &ResourceName, message: PubsubMessage) -> Result<String> {
        let request = PublishRequest {
            messages: vec![message],
        };
        let response: PublishResponse = self.post(&format!("{}:publish", topic), &request).await?;

        response
            .message_ids
            .into_iter()
            .next()
            .ok_or_else(|| Error::Publish(format!("no message ID returned for {}", topic)))
    }

    /// Pull up to `max_messages` messages.
    pub async fn pull(&self, subscription: &ResourceName, max_messages: usize) -> Result<Vec<ReceivedMessage>> {
        let request = PullRequest {
            max_messages: i32::try_from(max_messages).unwrap_or(i32::MAX),
        };
        let response: PullResponse = self.post(&format!("{}:pull", subscription), &request).await?;
        Ok(response.received_messages)
    }

    /// Acknowledge deliveries.
    pub async fn acknowledge(&self, subscription: &ResourceName, ack_ids: &[String]) -> Result<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }
        let request = AcknowledgeRequest {
            ack_ids: ack_ids.to_vec(),
        };
        let _: Empty = self
            .post(&format!("{}:acknowledge", subscription), &request)
            .await?;
        Ok(())
    }

    /// Set the ack deadline of deliveries to `seconds` from now.
    pub async fn modify_ack_deadline(
        &self,
        subscription: &ResourceName,
        ack_ids: &[String],
        seconds: u64,
    ) -> Result<()> {
        if ack_ids.is_empty() {
            return Ok(());
        }
        let request = ModifyAckDeadlineRequest {
            ack_ids: ack_ids.to_vec(),
            ack_deadline_seconds: i32::try_from(seconds).unwrap_or(600),
        };
        let _: Empty = self
            .post(&format!("{}:modifyAckDeadline", subscription), &request)
            .await?;
        Ok(())
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/v1/{}", self.inner.base_url, path);

        let mut request = self.inner.http.post(&url).json(body);
        if let Some(authorization) = self.inner.auth.authorization().await? {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);

        Err(Error::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl PubSubProvider for RestClient {
    async fn publish(&self, topic: &str, data: Vec<u8>) -> Result<String> {
        let topic = ResourceName::resolve_topic(self.project(), topic)?;
        self.publish_message(&topic, PubsubMessage::with_data(data))
            .await
    }

    async fn receive(&self, subscription: &str, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let subscription = ResourceName::resolve_subscription(self.project(), subscription)?;
        receiver::run(self.clone(), subscription, handler).await
    }
}
