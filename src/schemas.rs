//! # Schemas Module
//!
//! Wire-level data structures for the completion relay: inbound chat
//! requests from the IDE front-end, the payload forwarded to the xAI
//! upstream, and the SSE frame shape emitted back to the browser.

use serde::{Deserialize, Serialize};

/// Roles accepted in a conversation message.
pub const VALID_ROLES: [&str; 3] = ["system", "user", "assistant"];

/// # Chat Message
///
/// One entry of the ordered conversation list. Content is either a plain
/// string or a list of typed parts (text / image reference), matching the
/// OpenAI-compatible wire format the front-end sends.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

/// Message content: plain text or typed content parts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// A single typed content part inside a multi-part message.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

/// Image reference carried by an `image_url` content part.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

impl ChatMessage {
    /// Create a system message with plain-text content.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message with plain-text content.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create an assistant message with plain-text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message carrying a text prompt plus one image reference.
    pub fn user_with_image(text: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_url.into(),
                    },
                },
            ]),
        }
    }

    /// Whether this message carries at least one image reference.
    pub fn has_image(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Parts(parts) => parts
                .iter()
                .any(|part| matches!(part, ContentPart::ImageUrl { .. })),
        }
    }
}

/// Whether any message in the list carries an image reference. Decides the
/// text-vs-vision model routing once per request.
pub fn has_image_parts(messages: &[ChatMessage]) -> bool {
    messages.iter().any(ChatMessage::has_image)
}

/// # Completion Request
///
/// Inbound request body for `/api/ai/completions`. Constructed per call and
/// discarded once the response (streamed or not) completes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionRequest {
    /// Ordered conversation list; must be non-empty.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (0.0 to 2.0); default from config.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate; default from config, adjusted by payload size.
    pub max_tokens: Option<u32>,
    /// Whether to stream the response; defaults to true.
    pub stream: Option<bool>,
}

impl CompletionRequest {
    pub fn wants_stream(&self) -> bool {
        self.stream.unwrap_or(true)
    }
}

/// Payload sent to the upstream chat-completions endpoint.
#[derive(Debug, Serialize)]
pub struct UpstreamPayload<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// # Stream Chunk
///
/// One SSE frame emitted to the caller per upstream delta with non-empty
/// content. Serialized as `data: {"content":"..."}\n\n`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StreamChunk {
    pub content: String,
}

/// Inbound body for `/api/ai/generate-image`.
#[derive(Debug, Deserialize)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub n: Option<u32>,
    pub response_format: Option<String>,
}

/// Inbound body for `/api/ai/analyze-code`.
#[derive(Debug, Deserialize)]
pub struct CodeAnalysisRequest {
    pub code: String,
    pub language: String,
    #[serde(rename = "analysisType")]
    pub analysis_type: Option<String>,
    pub context: Option<String>,
}

/// Inbound body for `/api/ai/analyze-image`.
#[derive(Debug, Deserialize)]
pub struct ImageAnalysisRequest {
    #[serde(rename = "imageData")]
    pub image_data: String,
    pub prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_content_deserializes() {
        let msg: ChatMessage =
            serde_json::from_value(json!({"role": "user", "content": "hello"})).unwrap();
        assert!(matches!(msg.content, MessageContent::Text(ref t) if t == "hello"));
        assert!(!msg.has_image());
    }

    #[test]
    fn test_part_list_content_deserializes() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [
                {"type": "text", "text": "what is this?"},
                {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
            ]
        }))
        .unwrap();
        assert!(msg.has_image());
    }

    #[test]
    fn test_has_image_parts_scans_whole_list() {
        let messages = vec![
            ChatMessage::system("you are helpful"),
            ChatMessage::user("describe it"),
        ];
        assert!(!has_image_parts(&messages));

        let with_image = vec![
            ChatMessage::user("first"),
            ChatMessage::user_with_image("second", "https://example.com/a.png"),
        ];
        assert!(has_image_parts(&with_image));
    }

    #[test]
    fn test_text_only_parts_are_not_images() {
        let msg: ChatMessage = serde_json::from_value(json!({
            "role": "user",
            "content": [{"type": "text", "text": "no image here"}]
        }))
        .unwrap();
        assert!(!msg.has_image());
    }

    #[test]
    fn test_stream_defaults_to_true() {
        let req: CompletionRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}]
        }))
        .unwrap();
        assert!(req.wants_stream());

        let req: CompletionRequest = serde_json::from_value(json!({
            "messages": [{"role": "user", "content": "hi"}],
            "stream": false
        }))
        .unwrap();
        assert!(!req.wants_stream());
    }

    #[test]
    fn test_upstream_payload_serializes_flat() {
        let messages = vec![ChatMessage::user("hi")];
        let payload = UpstreamPayload {
            model: "grok-4-0709",
            messages: &messages,
            temperature: 0.7,
            max_tokens: 8000,
            stream: true,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["model"], "grok-4-0709");
        assert_eq!(value["messages"][0]["content"], "hi");
        assert_eq!(value["stream"], true);
    }
}
