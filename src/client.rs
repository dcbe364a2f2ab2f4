//! Core client trait and error types.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::model::{Message, Response};
use crate::options::{ModelOptions, TransportOptions};
use crate::splitter::ChannelOutput;

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Stream of cumulative channel snapshots produced while a reply streams in.
///
/// Every item holds the full reasoning and answer text received so far.
pub type ChannelStream = Pin<Box<dyn Stream<Item = Result<ChannelOutput, ClientError>> + Send>>;

/// Main client trait for chat-completion providers.
///
/// Each provider defines its own model and transport option types.
///
/// # Associated Types
/// - `ModelProvider`: Provider-specific model options (e.g., `OpenAiModel`)
/// - `TransportProvider`: Provider-specific transport options (e.g., `HttpTransport`)
///
/// # Required Methods
/// - `request`: Static method that sends a request with explicit options
/// - `new`: Constructor to create a client instance
/// - `model_options`: Accessor for the stored model options
/// - `transport_options`: Accessor for the stored transport options
///
/// # Provided Methods (with default implementations)
/// - `chat`: Uses default options
/// - `chat_with_options`: Overrides model options
#[async_trait]
pub trait Client: Send + Sync + Sized {
    /// Provider-specific model options type.
    type ModelProvider: Send + Sync;

    /// Provider-specific transport options type.
    type TransportProvider: Send + Sync;

    /// Core static request method that must be implemented by each provider.
    ///
    /// # Arguments
    /// - `messages`: Conversation messages
    /// - `model_options`: Model behavior options (temperature, max_tokens, etc.)
    /// - `transport_options`: Transport configuration (authentication, endpoints, etc.)
    async fn request(
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<Response, ClientError>;

    /// Create a new client instance with the given options.
    fn new(
        model_options: ModelOptions<Self::ModelProvider>,
        transport_options: TransportOptions<Self::TransportProvider>,
    ) -> Self;

    /// Get reference to the model options field.
    fn model_options(&self) -> &ModelOptions<Self::ModelProvider>;

    /// Get reference to the transport options field.
    fn transport_options(&self) -> &TransportOptions<Self::TransportProvider>;

    /// Instance method that uses default options stored in the client.
    async fn chat(&self, messages: Vec<Message>) -> Result<Response, ClientError> {
        Self::request(messages, self.model_options(), self.transport_options()).await
    }

    /// Instance method that overrides default model options.
    async fn chat_with_options(
        &self,
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
    ) -> Result<Response, ClientError> {
        Self::request(messages, model_options, self.transport_options()).await
    }
}

/// Extension trait for streaming support.
///
/// The returned stream yields a [`ChannelOutput`] snapshot each time new text
/// arrives. Dropping the stream abandons the reply; nothing is committed
/// anywhere unless the caller does so with the last snapshot.
///
/// # Example
/// ```rust,ignore
/// let mut stream = client.chat_stream(messages).await?;
/// let mut last = ChannelOutput::default();
/// while let Some(snapshot) = stream.next().await {
///     last = snapshot?;
///     render(&last.reasoning, &last.answer);
/// }
/// conversation.commit_reply(&last);
/// ```
#[async_trait]
pub trait StreamingClient: Client {
    /// Static streaming method.
    async fn request_stream(
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
        transport_options: &TransportOptions<Self::TransportProvider>,
    ) -> Result<ChannelStream, ClientError>;

    /// Instance method for streaming that uses default options.
    async fn chat_stream(&self, messages: Vec<Message>) -> Result<ChannelStream, ClientError> {
        Self::request_stream(
            messages,
            <Self as Client>::model_options(self),
            <Self as Client>::transport_options(self),
        )
        .await
    }

    /// Instance method for streaming that overrides default model options.
    async fn chat_stream_with_options(
        &self,
        messages: Vec<Message>,
        model_options: &ModelOptions<Self::ModelProvider>,
    ) -> Result<ChannelStream, ClientError> {
        Self::request_stream(
            messages,
            model_options,
            <Self as Client>::transport_options(self),
        )
        .await
    }
}
