//! Wire messages exchanged between frames.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::result::InsightsResult;

/// A command sent to another window, optionally carrying a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    /// Namespaced command name
    pub command: String,
    /// Command payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl CommandMessage {
    /// Create a message with no payload
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            payload: None,
        }
    }

    /// Attach a payload
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Decode the payload into `T`; a missing payload decodes from `null`
    pub fn decode_payload<T: DeserializeOwned>(&self) -> InsightsResult<T> {
        let value = self.payload.clone().unwrap_or(Value::Null);
        Ok(serde_json::from_value(value)?)
    }
}

/// The answer a listener sends back to the sender of a command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Response payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl CommandResponse {
    /// A response carrying `payload`
    #[must_use]
    pub const fn with_payload(payload: Value) -> Self {
        Self {
            payload: Some(payload),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_without_payload_omits_field() {
        let json = serde_json::to_string(&CommandMessage::new("insights.pingFrame-x")).unwrap();
        assert_eq!(json, r#"{"command":"insights.pingFrame-x"}"#);
    }

    #[test]
    fn test_decode_payload() {
        let message = CommandMessage::new("cmd").with_payload(json!({"count": 3}));
        let value: std::collections::HashMap<String, u32> = message.decode_payload().unwrap();
        assert_eq!(value["count"], 3);
    }

    #[test]
    fn test_decode_missing_payload_as_option() {
        let message = CommandMessage::new("cmd");
        let value: Option<u32> = message.decode_payload().unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_decode_rejects_wrong_shape() {
        let message = CommandMessage::new("cmd").with_payload(json!("not a number"));
        assert!(message.decode_payload::<u32>().is_err());
    }
}
