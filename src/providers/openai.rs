//! OpenAI-compatible chat-completions client.
//!
//! See: <https://platform.openai.com/docs/api-reference/chat/create>

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::CompletionProvider;
use crate::keystore::ApiKey;
use crate::types::{ChatResponse, GenerationRequest, Message, Usage};
use crate::{Result, ScrivenerError};

/// Default base URL for the OpenAI API
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Upper bound on one completion call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for `POST /v1/chat/completions`.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
}

impl OpenAiClient {
    /// Create a client for the public OpenAI endpoint.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (compatible gateways, wiremock).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom base URL and request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScrivenerError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        api_key: &ApiKey,
        messages: &[Message],
        request: &GenerationRequest,
    ) -> Result<ChatResponse> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = CompletionRequest {
            model: request.model.as_str(),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| ScrivenerError::UpstreamTransport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ScrivenerError::UpstreamTransport(e.to_string()))?;
        debug!(status = status.as_u16(), bytes = text.len(), "completion response");

        if !status.is_success() {
            let message = serde_json::from_str::<CompletionBody>(&text)
                .ok()
                .and_then(|b| b.error)
                .map(|e| e.message)
                .unwrap_or_else(|| format!("provider returned {status}"));
            return Err(ScrivenerError::UpstreamApi {
                status: status.as_u16(),
                message,
            });
        }

        parse_completion(status.as_u16(), &text)
    }
}

/// Interpret a 2xx completion body.
pub(crate) fn parse_completion(status: u16, text: &str) -> Result<ChatResponse> {
    let body: CompletionBody = serde_json::from_str(text)
        .map_err(|e| ScrivenerError::MalformedUpstreamResponse(e.to_string()))?;

    if let Some(error) = body.error {
        return Err(ScrivenerError::UpstreamApi {
            status,
            message: error.message,
        });
    }

    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| {
            ScrivenerError::MalformedUpstreamResponse(
                "missing choices[0].message.content".to_string(),
            )
        })?;

    Ok(ChatResponse {
        content,
        usage: body.usage.unwrap_or_default(),
        model: body.model,
    })
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_and_usage() {
        let body = r#"{
            "model": "gpt-4",
            "choices": [{"message": {"role": "assistant", "content": "Hello"}}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        }"#;
        let response = parse_completion(200, body).unwrap();
        assert_eq!(response.content, "Hello");
        assert_eq!(response.usage.total_tokens, 7);
        assert_eq!(response.model.as_deref(), Some("gpt-4"));
    }

    #[test]
    fn missing_usage_counts_zero_tokens() {
        let body = r#"{"choices": [{"message": {"content": "Hi"}}]}"#;
        assert_eq!(parse_completion(200, body).unwrap().usage.total_tokens, 0);
    }

    #[test]
    fn missing_content_is_malformed() {
        for body in [
            r#"{"choices": []}"#,
            r#"{"choices": [{"message": {}}]}"#,
            r#"{"choices": [{}]}"#,
            r#"{}"#,
        ] {
            assert!(
                matches!(
                    parse_completion(200, body),
                    Err(ScrivenerError::MalformedUpstreamResponse(_))
                ),
                "body {body} should be malformed"
            );
        }
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            parse_completion(200, "<html>"),
            Err(ScrivenerError::MalformedUpstreamResponse(_))
        ));
    }

    #[test]
    fn error_payload_is_api_error() {
        let body = r#"{"error": {"message": "quota exceeded", "type": "insufficient_quota"}}"#;
        match parse_completion(200, body) {
            Err(ScrivenerError::UpstreamApi { status, message }) => {
                assert_eq!(status, 200);
                assert_eq!(message, "quota exceeded");
            }
            other => panic!("expected UpstreamApi, got {other:?}"),
        }
    }

    #[test]
    fn request_serializes_openai_shape() {
        let messages = [Message::system("sys"), Message::user("hi")];
        let body = CompletionRequest {
            model: "gpt-4",
            messages: &messages,
            max_tokens: 100,
            temperature: 0.5,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["max_tokens"], 100);
    }
}
