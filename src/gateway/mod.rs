//! # Completion Gateway
//!
//! Wraps HTTP calls to the upstream chat-completion endpoint. The gateway
//! translates a [`CompletionRequest`] into exactly one upstream call per
//! invocation (plus bounded transport-level retries for network errors and
//! 5xx), selects the text or vision model, and applies the payload-size
//! token-budget heuristic. It holds no session state between calls.

use crate::{
    config::Config,
    core::http_client::HttpClientBuilder,
    error::RelayError,
    schemas::{has_image_parts, ChatMessage, CompletionRequest, UpstreamPayload, VALID_ROLES},
};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Gateway to the upstream xAI API. Cheap to clone; the underlying reqwest
/// client is pooled and shared.
#[derive(Clone)]
pub struct CompletionGateway {
    client: Client,
    config: Config,
}

impl CompletionGateway {
    /// Create a gateway from configuration, building the shared HTTP client.
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        let client = HttpClientBuilder::from_config(config)
            .build()
            .map_err(|e| RelayError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::new(config.clone(), client))
    }

    /// Create a gateway with an explicit client (used by tests).
    pub fn new(config: Config, client: Client) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn api_key(&self) -> Result<&str, RelayError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| RelayError::Configuration("XAI_API_KEY is not set".to_string()))
    }

    /// Pick the text or vision model. Pure function of the message list,
    /// decided once per call: any image part routes to the vision variant.
    pub fn select_model(&self, messages: &[ChatMessage]) -> &str {
        if has_image_parts(messages) {
            &self.config.vision_model
        } else {
            &self.config.chat_model
        }
    }

    /// Scale the requested token budget by serialized payload size. Very
    /// large contexts tend to need proportionally larger completions; both
    /// scales are capped. Thresholds and multipliers come from config.
    pub fn adjusted_max_tokens(&self, requested: Option<u32>, payload_size: usize) -> u32 {
        let requested = requested.unwrap_or(self.config.default_max_tokens);
        let cfg = &self.config;

        if payload_size > cfg.payload_large_threshold {
            let scaled = (requested as f32 * cfg.large_token_scale) as u32;
            let adjusted = scaled.min(cfg.large_token_cap);
            info!(payload_size, adjusted, "very large payload, increased max_tokens");
            adjusted
        } else if payload_size > cfg.payload_medium_threshold {
            let scaled = (requested as f32 * cfg.medium_token_scale) as u32;
            let adjusted = scaled.min(cfg.medium_token_cap);
            info!(payload_size, adjusted, "large payload, increased max_tokens");
            adjusted
        } else {
            requested
        }
    }

    /// Validate the inbound request fields the gateway is responsible for.
    fn validate(&self, request: &CompletionRequest) -> Result<(), RelayError> {
        if request.messages.is_empty() {
            return Err(RelayError::BadRequest(
                "messages must be a non-empty array".to_string(),
            ));
        }
        for message in &request.messages {
            if !VALID_ROLES.contains(&message.role.as_str()) {
                return Err(RelayError::BadRequest(format!(
                    "invalid message role '{}'",
                    message.role
                )));
            }
        }
        if let Some(temperature) = request.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(RelayError::BadRequest(format!(
                    "temperature {} is out of range [0, 2]",
                    temperature
                )));
            }
        }
        if request.max_tokens == Some(0) {
            return Err(RelayError::BadRequest(
                "max_tokens must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Make a non-streaming completion call and return the upstream JSON
    /// body unmodified.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<serde_json::Value, RelayError> {
        let response = self.post_completion(request, false).await?;
        let bytes = response.bytes().await?;
        let json = serde_json::from_slice::<serde_json::Value>(&bytes).map_err(|e| {
            RelayError::Serialization(format!("error decoding upstream body: {}", e))
        })?;
        Ok(json)
    }

    /// Open a streaming completion and return the response handle; the relay
    /// consumes its byte stream.
    pub async fn open_stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<reqwest::Response, RelayError> {
        self.post_completion(request, true).await
    }

    async fn post_completion(
        &self,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, RelayError> {
        self.validate(request)?;
        let api_key = self.api_key()?;

        // Serialize once: the size drives the token budget heuristic.
        let serialized = serde_json::to_string(&request.messages)?;
        let payload = UpstreamPayload {
            model: self.select_model(&request.messages),
            messages: &request.messages,
            temperature: request
                .temperature
                .unwrap_or(self.config.default_temperature),
            max_tokens: self.adjusted_max_tokens(request.max_tokens, serialized.len()),
            stream,
        };

        info!(
            message_count = request.messages.len(),
            model = payload.model,
            max_tokens = payload.max_tokens,
            stream,
            "processing completion request"
        );

        let url = format!("{}/chat/completions", self.config.base_url_trimmed());
        self.send_with_retry(&url, api_key, &payload).await
    }

    /// POST a payload with bounded linear-backoff retries. Network failures
    /// and upstream 5xx are retried; 4xx never are.
    async fn send_with_retry<T: serde::Serialize>(
        &self,
        url: &str,
        api_key: &str,
        payload: &T,
    ) -> Result<reqwest::Response, RelayError> {
        let mut attempt: u32 = 0;
        loop {
            let result = self
                .client
                .post(url)
                .header("Authorization", format!("Bearer {}", api_key))
                .json(payload)
                .send()
                .await;

            let error = match result {
                Ok(response) => {
                    let status = response.status();
                    debug!(%status, url, "upstream response");
                    if status.is_success() {
                        return Ok(response);
                    }
                    let error = classify_failure(response).await;
                    if !status.is_server_error() {
                        return Err(error);
                    }
                    error
                }
                Err(err) => {
                    let error = RelayError::from(err);
                    if !matches!(error, RelayError::Unavailable(_)) {
                        return Err(error);
                    }
                    error
                }
            };

            if attempt >= self.config.upstream_retries {
                return Err(error);
            }
            attempt += 1;
            let backoff = Duration::from_millis(self.config.retry_backoff_ms * attempt as u64);
            warn!(attempt, error = %error, "retrying upstream request");
            tokio::time::sleep(backoff).await;
        }
    }

    /// Generate an image via the upstream image endpoint. Non-streaming,
    /// same retry policy as completions.
    pub async fn generate_image(
        &self,
        prompt: &str,
        n: u32,
        response_format: &str,
    ) -> Result<serde_json::Value, RelayError> {
        let api_key = self.api_key()?;

        let payload = serde_json::json!({
            "model": self.config.image_model,
            "prompt": prompt,
            "n": n,
            "response_format": response_format,
        });

        info!(n, response_format, "processing image generation request");

        let url = format!("{}/images/generations", self.config.base_url_trimmed());
        let response = self.send_with_retry(&url, api_key, &payload).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            RelayError::Serialization(format!("error decoding image response: {}", e))
        })
    }
}

/// Extract the full assistant message content from a non-streaming
/// chat-completion body (`choices[0].message.content`).
pub fn extract_message_content(body: &serde_json::Value) -> Option<&str> {
    body.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
}

/// Turn a non-2xx upstream response into a typed failure carrying the
/// upstream status and, where parseable, its error payload.
async fn classify_failure(response: reqwest::Response) -> RelayError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    let details = serde_json::from_slice::<serde_json::Value>(&body).ok();

    if status.is_server_error() {
        return RelayError::Unavailable(format!("upstream returned HTTP {}", status.as_u16()));
    }

    let message = details
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| match status.as_u16() {
            401 => "invalid API key".to_string(),
            413 => "request too large, try reducing the input size".to_string(),
            429 => "rate limit exceeded, please try again later".to_string(),
            code => format!("upstream rejected the request (HTTP {})", code),
        });

    RelayError::Upstream {
        status: status.as_u16(),
        message,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::ChatMessage;

    fn gateway() -> CompletionGateway {
        let mut config = Config::for_test();
        config.api_key = Some("test-key".to_string());
        CompletionGateway::new(config, Client::new())
    }

    #[test]
    fn test_select_model_text_only() {
        let gw = gateway();
        let messages = vec![ChatMessage::user("hello")];
        assert_eq!(gw.select_model(&messages), "grok-4-0709");
    }

    #[test]
    fn test_select_model_with_image() {
        let gw = gateway();
        let messages = vec![
            ChatMessage::user("first"),
            ChatMessage::user_with_image("look", "https://example.com/x.png"),
        ];
        assert_eq!(gw.select_model(&messages), "grok-vision-beta");
    }

    #[test]
    fn test_token_budget_unchanged_below_medium() {
        let gw = gateway();
        assert_eq!(gw.adjusted_max_tokens(Some(8000), 10_000), 8000);
        assert_eq!(gw.adjusted_max_tokens(Some(8000), 50_000), 8000);
    }

    #[test]
    fn test_token_budget_medium_scale() {
        let gw = gateway();
        // min(4000 * 1.5, 12000) = 6000
        assert_eq!(gw.adjusted_max_tokens(Some(4000), 60_000), 6000);
        // min(10000 * 1.5, 12000) = 12000
        assert_eq!(gw.adjusted_max_tokens(Some(10_000), 60_000), 12_000);
    }

    #[test]
    fn test_token_budget_large_scale() {
        let gw = gateway();
        // min(4000 * 2, 16000) = 8000
        assert_eq!(gw.adjusted_max_tokens(Some(4000), 150_000), 8000);
        // min(10000 * 2, 16000) = 16000
        assert_eq!(gw.adjusted_max_tokens(Some(10_000), 150_000), 16_000);
    }

    #[test]
    fn test_token_budget_defaults_when_absent() {
        let gw = gateway();
        assert_eq!(gw.adjusted_max_tokens(None, 100), 8000);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let config = Config::for_test();
        let gw = CompletionGateway::new(config, Client::new());
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            temperature: None,
            max_tokens: None,
            stream: Some(false),
        };
        match gw.complete(&request).await {
            Err(RelayError::Configuration(_)) => {}
            other => panic!("expected configuration error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_empty_messages_rejected() {
        let gw = gateway();
        let request = CompletionRequest {
            messages: vec![],
            temperature: None,
            max_tokens: None,
            stream: Some(false),
        };
        match gw.complete(&request).await {
            Err(RelayError::BadRequest(msg)) => assert!(msg.contains("non-empty")),
            other => panic!("expected bad request, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_temperature_rejected() {
        let gw = gateway();
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            temperature: Some(3.0),
            max_tokens: None,
            stream: Some(false),
        };
        assert!(matches!(
            gw.complete(&request).await,
            Err(RelayError::BadRequest(_))
        ));
    }

    #[test]
    fn test_extract_message_content() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Paris."}}]
        });
        assert_eq!(extract_message_content(&body), Some("Paris."));

        let empty = serde_json::json!({"choices": []});
        assert_eq!(extract_message_content(&empty), None);
    }
}
