//! JSON request/response types of the Pub/Sub v1 REST API.
//!
//! Only the subset used by the client is modelled: publish, pull,
//! acknowledge and modifyAckDeadline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pubsub::Message;

/// A Pub/Sub message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubsubMessage {
    /// Message data (base64-encoded on the wire).
    #[serde(with = "base64", default)]
    pub data: Vec<u8>,
    /// Message attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<BTreeMap<String, String>>,
    /// Message ID (set by server).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Publish timestamp (set by server).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<String>,
    /// Ordering key for ordered delivery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering_key: Option<String>,
}

impl PubsubMessage {
    /// Outgoing message carrying only a payload.
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// Convert into the client-side message model.
    ///
    /// A missing or unparseable publish time maps to the Unix epoch.
    pub fn into_message(self) -> Message {
        let publish_time = self
            .publish_time
            .as_deref()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_default();

        Message {
            id: self.message_id.unwrap_or_default(),
            data: self.data,
            attributes: self.attributes.unwrap_or_default(),
            publish_time,
            ordering_key: self.ordering_key.unwrap_or_default(),
        }
    }
}

// Base64 encoding/decoding helpers
mod base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(serde::de::Error::custom)
    }
}

/// Request for publishing messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Messages to publish.
    pub messages: Vec<PubsubMessage>,
}

/// Response for publishing messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    /// Message IDs assigned by the server.
    #[serde(default)]
    pub message_ids: Vec<String>,
}

/// Request for pulling messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// Maximum number of messages to return.
    pub max_messages: i32,
}

/// Response for pulling messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Received messages. Omitted by the service when nothing is available.
    #[serde(default)]
    pub received_messages: Vec<ReceivedMessage>,
}

/// A received message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedMessage {
    /// Acknowledgment ID.
    pub ack_id: String,
    /// The message.
    pub message: PubsubMessage,
    /// Delivery attempt counter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_attempt: Option<i32>,
}

/// Request for acknowledging messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    /// Acknowledgment IDs.
    pub ack_ids: Vec<String>,
}

/// Request for modifying ack deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyAckDeadlineRequest {
    /// Acknowledgment IDs.
    pub ack_ids: Vec<String>,
    /// New deadline in seconds, counted from now.
    pub ack_deadline_seconds: i32,
}

/// Empty response body (`{}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Empty {}

/// Error response format for Google Cloud APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// HTTP status code.
    pub code: u16,
    /// Error message.
    pub message: String,
    /// Error status string.
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_publish_request_encodes_base64() {
        let request = PublishRequest {
            messages: vec![PubsubMessage::with_data(b"hello".to_vec())],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"messages": [{"data": "aGVsbG8="}]}));
    }

    #[test]
    fn test_pull_response_decodes_message() {
        let body = json!({
            "receivedMessages": [{
                "ackId": "ack-1",
                "message": {
                    "data": "d29ybGQ=",
                    "attributes": {"a": "1"},
                    "messageId": "42",
                    "publishTime": "2024-05-01T12:30:00.250Z",
                    "orderingKey": "k"
                },
                "deliveryAttempt": 3
            }]
        });

        let response: PullResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.received_messages.len(), 1);

        let received = response.received_messages[0].clone();
        assert_eq!(received.ack_id, "ack-1");
        assert_eq!(received.delivery_attempt, Some(3));

        let message = received.message.into_message();
        assert_eq!(message.id, "42");
        assert_eq!(message.data, b"world");
        assert_eq!(message.attributes.get("a").map(String::as_str), Some("1"));
        assert_eq!(message.ordering_key, "k");
        assert_eq!(message.publish_time.timestamp_millis(), 1714566600250);
    }

    #[test]
    fn test_empty_pull_response() {
        let response: PullResponse = serde_json::from_str("{}").unwrap();
        assert!(response.received_messages.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let message: PubsubMessage = serde_json::from_value(json!({"messageId": "7"})).unwrap();
        let message = message.into_message();
        assert!(message.data.is_empty());
        assert!(message.attributes.is_empty());
        assert_eq!(message.ordering_key, "");
        assert_eq!(message.publish_time.timestamp(), 0);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let result: std::result::Result<PubsubMessage, _> =
            serde_json::from_value(json!({"data": "not base64!"}));
        assert!(result.is_err());
    }
}
