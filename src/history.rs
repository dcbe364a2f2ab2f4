//! Conversation history.
//!
//! Conversations keep the messages exactly as they are sent to the API;
//! assistant replies are stored in the `<think>{reasoning}</think>{answer}`
//! encoding and decoded again for display. The history serializes to JSON
//! text; where that text is stored is up to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::client::ClientError;
use crate::model::{Message, Role};
use crate::splitter::ChannelOutput;

/// Title of a conversation before its first user message.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Reply a front-end shows when a request fails. It is never stored.
pub const FALLBACK_REPLY: &str = "Sorry, there was an error communicating with the API. \
Please check your connection and API settings.";

const TITLE_MAX_CHARS: usize = 30;

/// A rendered entry of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    User(String),
    Assistant(ChannelOutput),
}

/// One chat thread.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a conversation, optionally seeded with a system prompt.
    pub fn new(system_prompt: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: NEW_CHAT_TITLE.to_string(),
            messages: system_prompt.map(Message::system).into_iter().collect(),
            created_at: Utc::now(),
        }
    }

    /// Append a user message. The first one names the conversation.
    pub fn push_user(&mut self, message: Message) {
        if self.title == NEW_CHAT_TITLE {
            self.title = title_from(&message.text());
        }
        self.messages.push(message);
    }

    /// Store a completed reply in the persisted encoding.
    pub fn commit_reply(&mut self, output: &ChannelOutput) {
        self.messages.push(Message::assistant(output.to_persisted()));
    }

    /// A failed request stores nothing; returns the text to show instead.
    pub fn commit_failure(&self, error: &ClientError) -> &'static str {
        debug!(conversation = %self.id, error = %error, "reply not committed");
        FALLBACK_REPLY
    }

    /// Messages prepared for display, system messages excluded.
    ///
    /// Assistant messages are decoded into reasoning and answer. Decoded
    /// channels are trimmed; content without markers is shown as stored.
    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.messages
            .iter()
            .filter_map(|message| match message.role() {
                Role::System => None,
                Role::User => Some(TranscriptEntry::User(message.text())),
                Role::Assistant => {
                    let content = message.text();
                    let output = match ChannelOutput::parse_persisted(&content) {
                        Some(decoded) => decoded.trimmed(),
                        None => ChannelOutput::new("", content),
                    };
                    Some(TranscriptEntry::Assistant(output))
                }
            })
            .collect()
    }
}

/// Title from the first user message: its first 30 characters, with `...`
/// appended when it was longer.
pub fn title_from(text: &str) -> String {
    let mut chars = text.chars();
    let title: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", title)
    } else {
        title
    }
}

/// All conversations, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatHistory {
    pub conversations: Vec<Conversation>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new conversation at the top of the history.
    pub fn start(&mut self, system_prompt: Option<&str>) -> &mut Conversation {
        self.conversations.insert(0, Conversation::new(system_prompt));
        &mut self.conversations[0]
    }

    pub fn get(&self, id: Uuid) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Conversation> {
        let index = self.conversations.iter().position(|c| c.id == id)?;
        Some(self.conversations.remove(index))
    }

    pub fn clear(&mut self) {
        self.conversations.clear();
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn to_json(&self) -> Result<String, ClientError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageAttachment;

    #[test]
    fn test_title_from_short_message() {
        assert_eq!(title_from("Hello"), "Hello");
    }

    #[test]
    fn test_title_from_long_message() {
        let text = "What is the capital of France and why?";
        assert_eq!(title_from(text), "What is the capital of France ...");
        assert_eq!(title_from(&"ж".repeat(31)), format!("{}...", "ж".repeat(30)));
        assert_eq!(title_from(&"ж".repeat(30)), "ж".repeat(30));
    }

    #[test]
    fn test_first_user_message_names_conversation() {
        let mut conversation = Conversation::new(Some("be brief"));
        assert_eq!(conversation.title, NEW_CHAT_TITLE);

        conversation.push_user(Message::user("first"));
        conversation.push_user(Message::user("second"));
        assert_eq!(conversation.title, "first");
        assert_eq!(conversation.messages.len(), 3);
    }

    #[test]
    fn test_commit_reply_and_transcript() {
        let mut conversation = Conversation::new(Some("system"));
        let image = ImageAttachment::from_bytes("image/png", b"png");
        conversation.push_user(Message::user_with_images("look", vec![image]));
        conversation.commit_reply(&ChannelOutput::new("\nthinking\n", "\n\nanswer"));
        conversation.messages.push(Message::assistant("  no markers here\n"));

        assert_eq!(
            conversation.messages[2],
            Message::assistant("<think>\nthinking\n</think>\n\nanswer")
        );
        assert_eq!(
            conversation.transcript(),
            vec![
                TranscriptEntry::User("look".to_string()),
                TranscriptEntry::Assistant(ChannelOutput::new("thinking", "answer")),
                TranscriptEntry::Assistant(ChannelOutput::new("", "  no markers here\n")),
            ]
        );
    }

    #[test]
    fn test_failure_commits_nothing() {
        let conversation = Conversation::new(None);
        let error = ClientError::ProviderError("HTTP 500".to_string());
        let reply = conversation.commit_failure(&error);
        assert_eq!(reply, FALLBACK_REPLY);
        assert!(conversation.messages.is_empty());
    }

    #[test]
    fn test_history_management() {
        let mut history = ChatHistory::new();
        let first = history.start(None).id;
        let second = history.start(None).id;

        assert_eq!(history.conversations[0].id, second);
        history
            .get_mut(first)
            .unwrap()
            .push_user(Message::user("hello"));
        assert_eq!(history.get(first).unwrap().title, "hello");

        assert!(history.remove(second).is_some());
        assert!(history.remove(second).is_none());
        assert_eq!(history.len(), 1);

        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn test_history_json_round_trip() {
        let mut history = ChatHistory::new();
        let conversation = history.start(Some("system"));
        conversation.push_user(Message::user("question"));
        conversation.commit_reply(&ChannelOutput::new("r", "a"));

        let json = history.to_json().unwrap();
        assert_eq!(ChatHistory::from_json(&json).unwrap(), history);
    }

    #[test]
    fn test_history_from_invalid_json() {
        assert!(matches!(
            ChatHistory::from_json("not json"),
            Err(ClientError::Parse(_))
        ));
    }
}
