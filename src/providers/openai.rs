//! OpenAI-compatible Chat Completions client implementation.
//!
//! Works against any server speaking the `/v1/chat/completions` protocol
//! (OpenAI, llama.cpp, vLLM, LM Studio, ...). Streamed replies are split into
//! reasoning and answer channels on the fly.
//! See: <https://platform.openai.com/docs/api-reference/chat>

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{ChannelStream, Client, ClientError, StreamingClient};
use crate::http::{add_bearer_auth, add_extra_headers, build_http_client};
use crate::model::{FinishReason, Message, Part, Response, Role, Usage};
use crate::options::{HttpTransport, ModelOptions, OpenAiModel, TransportOptions, DEFAULT_MODEL};
use crate::splitter::ChannelOutput;
use crate::sse::SSEResponseExt;

const DEFAULT_API_BASE: &str = "https://api.openai.com";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// Chat Completions client using HTTP transport.
pub struct OpenAiClient {
    model_options: ModelOptions<OpenAiModel>,
    transport_options: TransportOptions<HttpTransport>,
}

impl OpenAiClient {
    /// Create a new client with default options.
    pub fn new(
        model_options: ModelOptions<OpenAiModel>,
        transport_options: TransportOptions<HttpTransport>,
    ) -> Self {
        Self {
            model_options,
            transport_options,
        }
    }

    /// Client configured from `THINKCHAT_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(
            ModelOptions::from_env(),
            TransportOptions::new(HttpTransport::from_env()),
        )
    }

    /// Send the request and fail on non-2xx statuses.
    async fn send(
        messages: Vec<Message>,
        model_options: &ModelOptions<OpenAiModel>,
        transport_options: &TransportOptions<HttpTransport>,
        stream: bool,
    ) -> Result<reqwest::Response, ClientError> {
        let api_base = transport_options
            .provider
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/');

        let url = format!("{}{}", api_base, COMPLETIONS_PATH);
        let mut request_body = ChatRequest::from((messages, model_options));
        request_body.stream = stream;

        debug!(
            %url,
            model = %request_body.model,
            messages = request_body.messages.len(),
            stream,
            "sending chat completion request"
        );

        // Build HTTP client with transport options
        let http_client = build_http_client(transport_options)?;

        let mut req = http_client
            .post(&url)
            .header(CONTENT_TYPE, "application/json");

        req = add_bearer_auth(req, transport_options.provider.api_key.as_ref());
        req = add_extra_headers(req, &transport_options.provider.extra_headers);

        let response = req.json(&request_body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "chat completion request failed");
            return Err(Self::handle_error_response(status, &body));
        }

        Ok(response)
    }

    /// Handle OpenAI-style error responses.
    fn handle_error_response(status: reqwest::StatusCode, body: &str) -> ClientError {
        if let Ok(error_resp) = serde_json::from_str::<OpenAiErrorResponse>(body) {
            ClientError::ProviderError(format!(
                "API error ({}, {}): {}",
                status,
                error_resp.error.error_type.as_deref().unwrap_or("unknown"),
                error_resp.error.message
            ))
        } else {
            ClientError::ProviderError(format!("HTTP {}: {}", status, body))
        }
    }
}

impl Default for OpenAiClient {
    fn default() -> Self {
        Self::new(
            ModelOptions::chat_defaults(),
            TransportOptions {
                timeout: None,
                provider: HttpTransport::default(),
            },
        )
    }
}

#[async_trait]
impl Client for OpenAiClient {
    type ModelProvider = OpenAiModel;
    type TransportProvider = HttpTransport;

    async fn request(
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<Response, ClientError> {
        let response = Self::send(messages, model_options, transport_options, false).await?;
        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response.into())
    }

    fn model_options(&self) -> &ModelOptions<Self::ModelProvider> {
        &self.model_options
    }

    fn transport_options(&self) -> &TransportOptions<Self::TransportProvider> {
        &self.transport_options
    }

    fn new(
        model_options: ModelOptions<Self::ModelProvider>,
        transport_options: TransportOptions<Self::TransportProvider>,
    ) -> Self {
        Self {
            model_options,
            transport_options,
        }
    }
}

#[async_trait]
impl StreamingClient for OpenAiClient {
    async fn request_stream(
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<ChannelStream, ClientError> {
        let response = Self::send(messages, model_options, transport_options, true).await?;
        Ok(Box::pin(response.channels(model_options.provider.marker_policy)))
    }
}

impl From<(Vec<Message>, &ModelOptions<OpenAiModel>)> for ChatRequest {
    fn from((messages, model_options): (Vec<Message>, &ModelOptions<OpenAiModel>)) -> Self {
        let system_prompt = model_options
            .instructions
            .as_ref()
            .filter(|_| messages.first().map(Message::role) != Some(Role::System))
            .map(|instructions| ChatMessage {
                role: Role::System,
                content: ChatContent::Text(instructions.clone()),
            });

        let messages = system_prompt
            .into_iter()
            .chain(messages.into_iter().map(ChatMessage::from))
            .collect();

        ChatRequest {
            model: model_options
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            messages,
            stream: false,
            temperature: model_options.temperature,
            top_p: model_options.top_p,
            max_tokens: model_options.max_tokens,
        }
    }
}

impl From<Message> for ChatMessage {
    fn from(msg: Message) -> Self {
        match msg {
            Message::Text { role, content } => ChatMessage {
                role,
                content: ChatContent::Text(content),
            },
            Message::Parts { role, parts } => ChatMessage {
                role,
                content: ChatContent::Parts(
                    parts
                        .into_iter()
                        .map(|part| match part {
                            Part::Text(text) => ChatContentPart::Text { text },
                            Part::Image(image) => ChatContentPart::ImageUrl {
                                image_url: ImageUrl {
                                    url: image.url().to_string(),
                                },
                            },
                        })
                        .collect(),
                ),
            },
        }
    }
}

impl From<ChatResponse> for Response {
    fn from(chat_resp: ChatResponse) -> Self {
        let choice = chat_resp.choices.into_iter().next();
        let finish = choice
            .as_ref()
            .and_then(|c| c.finish_reason.as_deref())
            .map_or(FinishReason::Stop, FinishReason::from);
        let content = choice
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        Response {
            channels: ChannelOutput::from_persisted(&content),
            usage: chat_resp.usage.map(|u| u.into()),
            finish,
        }
    }
}

// --- Chat Completions Request/Response Types ---

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: Role,
    content: ChatContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ChatContentPart>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ChatContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Copy, Clone, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

impl From<ChatUsage> for Usage {
    fn from(u: ChatUsage) -> Self {
        Usage {
            prompt_tokens: Some(u.prompt_tokens),
            completion_tokens: Some(u.completion_tokens),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiError {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageAttachment;
    use serde_json::json;

    #[test]
    fn test_request_prepends_system_prompt() {
        let options = ModelOptions::chat_defaults();
        let request = ChatRequest::from((vec![Message::user("hi")], &options));
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "qwen3-14b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1], json!({ "role": "user", "content": "hi" }));
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_keeps_existing_system_message() {
        let options = ModelOptions::chat_defaults();
        let request = ChatRequest::from((
            vec![Message::system("custom"), Message::user("hi")],
            &options,
        ));

        assert_eq!(request.messages.len(), 2);
        assert!(matches!(&request.messages[0].content, ChatContent::Text(t) if t == "custom"));
    }

    #[test]
    fn test_request_serializes_images() {
        let image = ImageAttachment::from_bytes("image/png", b"png");
        let message = Message::user_with_images("what is this?", vec![image.clone()]);
        let options = ModelOptions::new(OpenAiModel::default());
        let request = ChatRequest::from((vec![message], &options));
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body["messages"][0]["content"],
            json!([
                { "type": "text", "text": "what is this?" },
                { "type": "image_url", "image_url": { "url": image.url() } },
            ])
        );
    }

    #[test]
    fn test_response_decodes_reasoning() {
        let chat_response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "message": { "role": "assistant", "content": "<think>hmm</think>Paris" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8 }
        }))
        .unwrap();

        let response = Response::from(chat_response);
        assert_eq!(response.channels, ChannelOutput::new("hmm", "Paris"));
        assert_eq!(response.finish, FinishReason::Stop);
        assert_eq!(response.usage.unwrap().completion_tokens, Some(3));
    }

    #[test]
    fn test_handle_error_response() {
        let err = OpenAiClient::handle_error_response(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error":{"type":"invalid_request_error","message":"bad key"}}"#,
        );
        assert!(err.to_string().contains("bad key"));

        let err = OpenAiClient::handle_error_response(
            reqwest::StatusCode::BAD_GATEWAY,
            "upstream down",
        );
        assert_eq!(err.to_string(), "Provider error: HTTP 502 Bad Gateway: upstream down");
    }
}
