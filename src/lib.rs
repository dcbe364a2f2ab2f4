//! # thinkchat - streaming chat client core for reasoning models
//!
//! A small client library for OpenAI-compatible chat-completion servers whose
//! models interleave `<think>` reasoning with the final answer.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Incremental SSE parsing that is independent of chunk boundaries
//! - Reasoning/answer channel splitting while the reply streams in
//! - Persisted `<think>{reasoning}</think>{answer}` encoding and its decoder
//! - Conversation history with image attachments, serializable to JSON
//!
//! ## Architecture
//!
//! Bytes of the response body flow through the Stream Reader ([`sse`]), whose
//! content deltas are classified by the Marker Splitter ([`splitter`]). A
//! [`stream::StreamSession`] holds both for one reply. The [`client`] traits
//! and [`providers::OpenAiClient`] wrap this behind a request API that yields
//! cumulative [`ChannelOutput`] snapshots.
//!
//! ## Example
//! ```no_run
//! use futures::StreamExt;
//! use thinkchat::client::StreamingClient;
//! use thinkchat::history::Conversation;
//! use thinkchat::model::Message;
//! use thinkchat::options::{HttpTransport, ModelOptions, TransportOptions};
//! use thinkchat::providers::OpenAiClient;
//! use thinkchat::ChannelOutput;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenAiClient::new(
//!         ModelOptions::chat_defaults(),
//!         TransportOptions::new(
//!             HttpTransport::default().with_base_url("http://localhost:8080".to_string()),
//!         ),
//!     );
//!
//!     let mut conversation = Conversation::new(None);
//!     conversation.push_user(Message::user("Why is the sky blue?"));
//!
//!     let mut stream = client.chat_stream(conversation.messages.clone()).await?;
//!     let mut last = ChannelOutput::default();
//!     while let Some(snapshot) = stream.next().await {
//!         last = snapshot?;
//!     }
//!
//!     println!("reasoning: {}\nanswer: {}", last.reasoning, last.answer);
//!     conversation.commit_reply(&last);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod history;
pub mod http;
pub mod model;
pub mod options;
pub mod providers;
pub mod splitter;
pub mod sse;
pub mod stream;

// Re-exports for convenience
pub use client::{ChannelStream, Client, ClientError, StreamingClient};
pub use model::{Message, Response};
pub use splitter::{ChannelOutput, MarkerPolicy, MarkerSplitter};
pub use stream::StreamSession;
