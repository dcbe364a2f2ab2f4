//! Common data models for chat requests and responses.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use itertools::Itertools;
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::client::ClientError;
use crate::splitter::ChannelOutput;

/// Role of the message sender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// An image attached to a user message, held as a `data:` URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageAttachment {
    url: String,
}

impl ImageAttachment {
    /// Encode raw image bytes as `data:<media_type>;base64,<payload>`.
    pub fn from_bytes(media_type: &str, bytes: &[u8]) -> Self {
        Self {
            url: format!("data:{};base64,{}", media_type, STANDARD.encode(bytes)),
        }
    }

    /// Wrap an existing base64 `data:` URL.
    pub fn from_data_url(url: impl Into<String>) -> Result<Self, ClientError> {
        let url = url.into();
        match split_data_url(&url) {
            Some((_, payload)) if STANDARD.decode(payload).is_ok() => Ok(Self { url }),
            _ => Err(ClientError::Config(
                "image attachment must be a base64 data URL".to_string(),
            )),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// MIME type declared in the URL (e.g. `image/png`).
    pub fn media_type(&self) -> &str {
        split_data_url(&self.url).map_or("", |(media_type, _)| media_type)
    }

    /// Decode the embedded bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClientError> {
        let (_, payload) = split_data_url(&self.url).ok_or_else(|| {
            ClientError::Config("image attachment must be a base64 data URL".to_string())
        })?;
        STANDARD
            .decode(payload)
            .map_err(|e| ClientError::Config(format!("invalid image payload: {}", e)))
    }
}

fn split_data_url(url: &str) -> Option<(&str, &str)> {
    url.strip_prefix("data:")?.split_once(";base64,")
}

/// One element of a multimodal message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    Image(ImageAttachment),
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Message {
    Text {
        role: Role,
        content: String,
    },
    Parts {
        role: Role,
        parts: NonEmpty<Part>,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::Text {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::Text {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Text {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// User message carrying text followed by attached images.
    ///
    /// Without images this is a plain text message.
    pub fn user_with_images(text: impl Into<String>, images: Vec<ImageAttachment>) -> Self {
        if images.is_empty() {
            return Self::user(text);
        }

        Message::Parts {
            role: Role::User,
            parts: NonEmpty {
                head: Part::Text(text.into()),
                tail: images.into_iter().map(Part::Image).collect(),
            },
        }
    }

    /// Get the role of the message.
    pub fn role(&self) -> Role {
        match self {
            Message::Text { role, .. } | Message::Parts { role, .. } => *role,
        }
    }

    /// Text content; text parts of a multimodal message are joined by newlines.
    pub fn text(&self) -> String {
        match self {
            Message::Text { content, .. } => content.clone(),
            Message::Parts { parts, .. } => parts
                .iter()
                .filter_map(|part| match part {
                    Part::Text(text) => Some(text.as_str()),
                    Part::Image(_) => None,
                })
                .join("\n"),
        }
    }

    /// Images attached to the message.
    pub fn images(&self) -> Vec<&ImageAttachment> {
        match self {
            Message::Text { .. } => Vec::new(),
            Message::Parts { parts, .. } => parts
                .iter()
                .filter_map(|part| match part {
                    Part::Image(image) => Some(image),
                    Part::Text(_) => None,
                })
                .collect(),
        }
    }
}

/// Reason for finishing the response generation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other,
}

impl From<&str> for FinishReason {
    fn from(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Usage {
    /// Total prompt tokens used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u32>,

    /// Total completion tokens used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u32>,
}

/// Complete (non-streamed) reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Reply content decoded into reasoning and answer
    pub channels: ChannelOutput,

    /// Token usage information
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Finish reason for the response generation
    pub finish: FinishReason,
}

impl Response {
    /// Assistant message in the storage encoding.
    pub fn to_message(&self) -> Message {
        Message::assistant(self.channels.to_persisted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_from_bytes() {
        let image = ImageAttachment::from_bytes("image/png", &[0x89, b'P', b'N', b'G']);
        assert_eq!(image.url(), "data:image/png;base64,iVBORw==");
        assert_eq!(image.media_type(), "image/png");
        assert_eq!(image.to_bytes().unwrap(), vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_image_from_data_url_rejects_plain_url() {
        assert!(ImageAttachment::from_data_url("https://example.com/cat.png").is_err());
        assert!(ImageAttachment::from_data_url("data:image/png;base64,!!!").is_err());
        assert!(ImageAttachment::from_data_url("data:image/jpeg;base64,AAAA").is_ok());
    }

    #[test]
    fn test_user_with_images() {
        let image = ImageAttachment::from_bytes("image/jpeg", b"jpg");
        let message = Message::user_with_images("look", vec![image.clone()]);

        assert_eq!(message.role(), Role::User);
        assert_eq!(message.text(), "look");
        assert_eq!(message.images(), vec![&image]);
    }

    #[test]
    fn test_user_without_images_is_text() {
        let message = Message::user_with_images("hi", Vec::new());
        assert_eq!(message, Message::user("hi"));
        assert!(message.images().is_empty());
    }

    #[test]
    fn test_finish_reason_from_str() {
        assert_eq!(FinishReason::from("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from("length"), FinishReason::Length);
        assert_eq!(FinishReason::from("eos"), FinishReason::Other);
    }

    #[test]
    fn test_response_to_message() {
        let response = Response {
            channels: ChannelOutput::new("why", "because"),
            usage: None,
            finish: FinishReason::Stop,
        };
        assert_eq!(
            response.to_message(),
            Message::assistant("<think>why</think>because")
        );
    }
}
