//! Streaming chat example: prints reasoning and answer as they arrive.
//!
//! Run with:
//! ```bash
//! export THINKCHAT_BASE_URL="http://localhost:8080"
//! export THINKCHAT_API_KEY="optional-token"
//! cargo run --example chat_stream -- "Why is the sky blue?"
//! ```

use futures::StreamExt;
use std::io::Write;
use thinkchat::client::StreamingClient;
use thinkchat::history::ChatHistory;
use thinkchat::model::Message;
use thinkchat::options::{HttpTransport, ModelOptions, OpenAiModel, TransportOptions};
use thinkchat::providers::OpenAiClient;
use thinkchat::splitter::{ChannelOutput, MarkerPolicy};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "What is the capital of France? Answer in one word.".to_string());

    // Hold back partial markers so "<thi" + "nk>" is still recognized
    let mut model_options = ModelOptions::from_env();
    model_options.provider = OpenAiModel::default().with_marker_policy(MarkerPolicy::HoldBack);

    let client = OpenAiClient::new(
        model_options.clone(),
        TransportOptions::new(HttpTransport::from_env()),
    );

    let mut history = ChatHistory::new();
    let conversation = history.start(model_options.instructions.as_deref());
    conversation.push_user(Message::user(prompt));

    println!("Sending request...");

    let mut stream = match client.chat_stream(conversation.messages.clone()).await {
        Ok(stream) => stream,
        Err(e) => {
            eprintln!("{}", conversation.commit_failure(&e));
            return Err(e.into());
        }
    };

    // Snapshots are cumulative; print only what is new in each channel
    let mut shown = ChannelOutput::default();
    while let Some(snapshot) = stream.next().await {
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                eprintln!("\n{}", conversation.commit_failure(&e));
                return Err(e.into());
            }
        };

        if snapshot.reasoning.len() > shown.reasoning.len() {
            print!("\x1b[2m{}\x1b[0m", &snapshot.reasoning[shown.reasoning.len()..]);
        }
        if snapshot.answer.len() > shown.answer.len() {
            print!("{}", &snapshot.answer[shown.answer.len()..]);
        }
        std::io::stdout().flush()?;
        shown = snapshot;
    }
    println!();

    conversation.commit_reply(&shown);
    println!("\n=== Stored history ===\n{}", history.to_json()?);

    Ok(())
}
