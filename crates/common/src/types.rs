use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message queued for delivery.
///
/// `sent` flips from false to true exactly once and never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i64,
    pub recipient: String,
    pub content: String,
    pub sent: bool,
}

impl Message {
    /// Key under which the message's delivery receipts are cached.
    pub fn cache_key(&self) -> String {
        self.id.to_string()
    }
}

/// One chunk accepted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredChunk {
    /// Gateway-assigned id for this chunk
    pub message_id: String,
    pub sending_time: DateTime<Utc>,
    /// Exact chunk text that was delivered
    pub content: String,
}

/// Cached value holding every chunk of one message, in send order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDelivery {
    pub contents: Vec<DeliveredChunk>,
}

/// A sent message joined with whatever receipts the cache still holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessageView {
    pub recipient: String,
    pub contents: Vec<DeliveredChunk>,
}

/// Request body posted to the notification gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: String,
    pub content: String,
}

/// Gateway acknowledgement for a single accepted chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    #[serde(default)]
    pub message: String,
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivered_chunk_uses_camel_case_keys() {
        let chunk = DeliveredChunk {
            message_id: "67f2f8a8-ea58-4ed0-a6f9-ff217df4d849".to_string(),
            sending_time: DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            content: "Hello".to_string(),
        };

        let json = serde_json::to_value(&chunk).unwrap();
        assert_eq!(json["messageId"], "67f2f8a8-ea58-4ed0-a6f9-ff217df4d849");
        assert_eq!(json["sendingTime"], "2024-05-01T10:00:00Z");
        assert_eq!(json["content"], "Hello");
    }

    #[test]
    fn test_gateway_response_tolerates_missing_message() {
        let response: GatewayResponse =
            serde_json::from_str(r#"{"messageId":"abc-123"}"#).unwrap();
        assert_eq!(response.message_id, "abc-123");
        assert!(response.message.is_empty());
    }

    #[test]
    fn test_cache_key_is_decimal_id() {
        let message = Message {
            id: 42,
            recipient: "5325008081".to_string(),
            content: "Hello".to_string(),
            sent: false,
        };
        assert_eq!(message.cache_key(), "42");
    }
}
