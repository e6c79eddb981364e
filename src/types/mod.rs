//! Envelope: the JSON projection of a received message written to stdout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::pubsub::ReceivedMessage;
use crate::Result;

/// One received message, as printed on stdout.
///
/// Attribute keys serialize in sorted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Message ID.
    pub id: String,
    /// Payload rendered as UTF-8 (invalid sequences replaced).
    pub body: String,
    /// When the service accepted the message.
    pub publish_time: DateTime<Utc>,
    /// Message attributes.
    pub attributes: BTreeMap<String, String>,
    /// Ordering key, empty when unordered.
    pub ordering_key: String,
    /// Delivery attempt, `null` unless the subscription tracks it.
    pub delivery_attempt: Option<i32>,
}

impl Envelope {
    /// Project a received message.
    pub fn from_received(received: &ReceivedMessage) -> Self {
        let message = &received.message;
        Self {
            id: message.id.clone(),
            body: String::from_utf8_lossy(&message.data).into_owned(),
            publish_time: message.publish_time,
            attributes: message.attributes.clone(),
            ordering_key: message.ordering_key.clone(),
            delivery_attempt: received.delivery_attempt,
        }
    }

    /// Serialize as a single JSON line (without the trailing newline).
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<&ReceivedMessage> for Envelope {
    fn from(received: &ReceivedMessage) -> Self {
        Self::from_received(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pubsub::{Acknowledger, Message};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::Value;
    use std::sync::Arc;

    struct NoopAcker;

    #[async_trait]
    impl Acknowledger for NoopAcker {
        async fn acknowledge(&self, _ack_id: &str) -> crate::Result<()> {
            Ok(())
        }
    }

    fn received(data: &[u8], delivery_attempt: Option<i32>) -> ReceivedMessage {
        let mut attributes = BTreeMap::new();
        attributes.insert("a".to_string(), "1".to_string());

        ReceivedMessage::new(
            "ack-1",
            Message {
                id: "1001".to_string(),
                data: data.to_vec(),
                attributes,
                publish_time: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
                ordering_key: "k".to_string(),
            },
            delivery_attempt,
            Arc::new(NoopAcker),
        )
    }

    #[test]
    fn test_envelope_json_shape() {
        let json = Envelope::from_received(&received(b"hello", None))
            .to_json()
            .unwrap();

        assert!(json.contains(r#""attributes":{"a":"1"}"#));
        assert!(json.contains(r#""orderingKey":"k""#));
        assert!(json.contains(r#""deliveryAttempt":null"#));
        assert!(!json.contains('\n'));

        let value: Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 6);
        for key in ["id", "body", "publishTime", "attributes", "orderingKey", "deliveryAttempt"] {
            assert!(keys.contains(&key), "missing {}", key);
        }
        assert_eq!(value["id"], "1001");
        assert_eq!(value["body"], "hello");
        assert_eq!(value["publishTime"], "2024-01-02T03:04:05Z");
    }

    #[test]
    fn test_envelope_delivery_attempt_present() {
        let envelope = Envelope::from_received(&received(b"x", Some(4)));
        let value: Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(value["deliveryAttempt"], 4);
    }

    #[test]
    fn test_envelope_body_is_lossy_utf8() {
        let envelope = Envelope::from_received(&received(&[0x66, 0x6f, 0xff, 0x6f], None));
        assert_eq!(envelope.body, "fo\u{fffd}o");
    }

    #[test]
    fn test_envelope_parses_back() {
        let envelope = Envelope::from_received(&received(b"hello", Some(1)));
        let parsed: Envelope = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();
        assert_eq!(parsed, envelope);
    }
}
