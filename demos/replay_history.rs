//! Replays a captured SSE response body and shows how it splits.
//!
//! Run with:
//! ```bash
//! cargo run --example replay_history -- capture.sse [hold-back]
//! ```

use thinkchat::history::{Conversation, TranscriptEntry};
use thinkchat::model::Message;
use thinkchat::splitter::MarkerPolicy;
use thinkchat::stream::split_body;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let mut args = std::env::args().skip(1);
    let path = args.next().ok_or("usage: replay_history <capture.sse> [hold-back]")?;
    let policy = match args.next().as_deref() {
        Some("hold-back") => MarkerPolicy::HoldBack,
        _ => MarkerPolicy::PerFragment,
    };

    let body = std::fs::read(&path)?;
    let output = split_body(&body, policy);

    let mut conversation = Conversation::new(None);
    conversation.push_user(Message::user(format!("(replayed from {})", path)));
    conversation.commit_reply(&output);

    println!("Stored as: {:?}", conversation.messages.last().map(Message::text));

    for entry in conversation.transcript() {
        match entry {
            TranscriptEntry::User(text) => println!("\n> {}", text),
            TranscriptEntry::Assistant(channels) => {
                println!("\n--- reasoning ---\n{}", channels.reasoning);
                println!("\n--- answer ---\n{}", channels.answer);
            }
        }
    }

    Ok(())
}
