//! Decoding of the endpoint's JSON reply.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::Value;

use crate::widget::Message;

/// Prefix of every image URI produced from a reply.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Body returned by `POST /generate`.
///
/// Both fields are required; a body without them is treated as malformed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Messages produced while handling the request, in order. Entries are
    /// usually strings; turns that called a tool carry a list of content
    /// blocks instead.
    pub messages: Vec<Value>,
    /// Base64-encoded PNGs keyed by file name. Iterated in key order.
    pub files: BTreeMap<String, String>,
}

impl GenerateResponse {
    /// Parse a raw response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Convert into the agent messages to append.
    ///
    /// Only the last entry of `messages` is surfaced; earlier ones are
    /// intermediate output. Always yields exactly one message.
    #[must_use]
    pub fn into_messages(mut self) -> Vec<Message> {
        let text = self.messages.pop().map(message_text).unwrap_or_default();

        let images = self
            .files
            .into_iter()
            .filter_map(|(name, encoded)| {
                let encoded = encoded.trim();
                if STANDARD.decode(encoded).is_ok() {
                    Some(png_data_uri(encoded))
                } else {
                    tracing::warn!(
                        name: "chat.reply.image_skipped",
                        file = %name,
                        "Skipping image that is not valid base64"
                    );
                    None
                }
            })
            .collect();

        vec![Message::agent(text, images)]
    }
}

/// Text of one reply entry: the string itself, or the joined `text` of its
/// content blocks. Anything else has no text.
fn message_text(message: Value) -> String {
    match message {
        Value::String(text) => text,
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Wrap base64 PNG data in a `data:` URI.
#[must_use]
pub fn png_data_uri(encoded: &str) -> String {
    format!("{PNG_DATA_URI_PREFIX}{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Sender;

    #[test]
    fn test_single_message_no_files() {
        let reply = GenerateResponse::from_slice(br#"{"messages":["hello"],"files":{}}"#).unwrap();
        let messages = reply.into_messages();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].sender, Sender::Agent);
        assert!(messages[0].images.is_empty());
    }

    #[test]
    fn test_last_message_wins() {
        let body = br#"{"messages":["a","b"],"files":{"x":"iVBORw0KGgo="}}"#;
        let messages = GenerateResponse::from_slice(body).unwrap().into_messages();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "b");
        assert_eq!(messages[0].images.len(), 1);
        assert!(messages[0].images[0].starts_with(PNG_DATA_URI_PREFIX));
        assert_eq!(messages[0].images[0], "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_empty_messages_yield_empty_text() {
        let messages = GenerateResponse::from_slice(br#"{"messages":[],"files":{}}"#)
            .unwrap()
            .into_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "");
    }

    #[test]
    fn test_images_follow_key_order() {
        let body = br#"{"messages":["m"],"files":{"b.png":"Yg==","a.png":"YQ=="}}"#;
        let messages = GenerateResponse::from_slice(body).unwrap().into_messages();
        assert_eq!(
            messages[0].images,
            ["data:image/png;base64,YQ==", "data:image/png;base64,Yg=="]
        );
    }

    #[test]
    fn test_invalid_base64_is_dropped() {
        let body = br#"{"messages":["m"],"files":{"bad":"%%%","good":"YQ=="}}"#;
        let messages = GenerateResponse::from_slice(body).unwrap().into_messages();
        assert_eq!(messages[0].images, ["data:image/png;base64,YQ=="]);
    }

    #[test]
    fn test_tool_call_turns_do_not_break_decoding() {
        let body = br#"{
            "messages": [
                [{"type":"text","text":"let me plot"},{"type":"tool_use","id":"t1","name":"plot","input":{}}],
                "Here is your plot"
            ],
            "files": {"plot.png":"iVBORw0KGgo="}
        }"#;
        let messages = GenerateResponse::from_slice(body).unwrap().into_messages();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "Here is your plot");
        assert_eq!(messages[0].images, ["data:image/png;base64,iVBORw0KGgo="]);
    }

    #[test]
    fn test_block_list_as_last_entry_uses_its_text() {
        let body = br#"{
            "messages": [[{"type":"text","text":"first"},{"type":"tool_use","id":"t1"},{"type":"text","text":"second"}]],
            "files": {}
        }"#;
        let messages = GenerateResponse::from_slice(body).unwrap().into_messages();
        assert_eq!(messages[0].text, "first\nsecond");

        let body = br#"{"messages":[{"unexpected":1}],"files":{}}"#;
        let messages = GenerateResponse::from_slice(body).unwrap().into_messages();
        assert_eq!(messages[0].text, "");
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        assert!(GenerateResponse::from_slice(br#"{"messages":["x"]}"#).is_err());
        assert!(GenerateResponse::from_slice(br#"{"files":{}}"#).is_err());
        assert!(GenerateResponse::from_slice(b"not json").is_err());
        assert!(GenerateResponse::from_slice(br#"{"messages":"x","files":{}}"#).is_err());
    }
}
