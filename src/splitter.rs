//! Reasoning/answer channel demultiplexing.
//!
//! Models that "think out loud" wrap their reasoning in `<think>` / `</think>`
//! markers inside the regular content stream. This module separates that text
//! into two channels, either incrementally ([`MarkerSplitter`]) while a
//! response streams in, or in one shot ([`ChannelOutput::from_persisted`]) when
//! a stored message is loaded again.
//!
//! ```
//! use thinkchat::splitter::{ChannelOutput, MarkerSplitter};
//!
//! let mut splitter = MarkerSplitter::new();
//! let mut output = ChannelOutput::default();
//!
//! for fragment in ["Hello ", "<think>reasoning here</think>", "answer"] {
//!     output.apply(splitter.push(fragment));
//! }
//!
//! assert_eq!(output.reasoning, "reasoning here");
//! assert_eq!(output.answer, "Hello answer");
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Marker that opens the reasoning channel.
pub const OPEN_MARKER: &str = "<think>";

/// Marker that closes the reasoning channel.
pub const CLOSE_MARKER: &str = "</think>";

/// Output channel a piece of text is classified into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Answer,
    Reasoning,
}

impl Channel {
    /// The marker whose occurrence leaves this channel.
    fn exit_marker(self) -> &'static str {
        match self {
            Channel::Answer => OPEN_MARKER,
            Channel::Reasoning => CLOSE_MARKER,
        }
    }

    fn toggled(self) -> Self {
        match self {
            Channel::Answer => Channel::Reasoning,
            Channel::Reasoning => Channel::Answer,
        }
    }
}

/// How markers straddling two fragments are treated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarkerPolicy {
    /// Each fragment is scanned on its own. A marker split across two
    /// fragments (`"<thi"` + `"nk>"`) is not recognized and its characters
    /// end up verbatim in the current channel.
    #[default]
    PerFragment,

    /// A fragment suffix that could still grow into the sought marker is held
    /// back until the next fragment arrives (or [`MarkerSplitter::finish`]).
    /// No fragment boundary can hide a marker under this policy.
    HoldBack,
}

/// Text classified out of a single fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelDelta {
    pub reasoning: String,
    pub answer: String,
}

impl ChannelDelta {
    /// Whether the fragment contributed nothing to either channel.
    pub fn is_empty(&self) -> bool {
        self.reasoning.is_empty() && self.answer.is_empty()
    }

    fn push(&mut self, channel: Channel, text: &str) {
        match channel {
            Channel::Answer => self.answer.push_str(text),
            Channel::Reasoning => self.reasoning.push_str(text),
        }
    }
}

/// Two-state machine assigning incoming text to the reasoning or answer
/// channel.
///
/// Markers are consumed: once fully matched they never appear in the output.
#[derive(Debug, Clone, Default)]
pub struct MarkerSplitter {
    channel: Channel,
    policy: MarkerPolicy,
    held: String,
}

impl MarkerSplitter {
    /// Create a splitter with the [`MarkerPolicy::PerFragment`] policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a splitter with an explicit marker policy.
    pub fn with_policy(policy: MarkerPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Channel that text arriving next is appended to.
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Whether the splitter is currently inside `<think>` ... `</think>`.
    pub fn in_reasoning(&self) -> bool {
        self.channel == Channel::Reasoning
    }

    pub fn policy(&self) -> MarkerPolicy {
        self.policy
    }

    /// Classify one fragment.
    ///
    /// The returned delta holds only the text this fragment contributed.
    pub fn push(&mut self, fragment: &str) -> ChannelDelta {
        let mut delta = ChannelDelta::default();

        let mut buffered = std::mem::take(&mut self.held);
        buffered.push_str(fragment);
        let mut rest = buffered.as_str();

        loop {
            let marker = self.channel.exit_marker();
            match rest.find(marker) {
                Some(pos) => {
                    delta.push(self.channel, &rest[..pos]);
                    rest = &rest[pos + marker.len()..];
                    self.channel = self.channel.toggled();
                    trace!(channel = ?self.channel, "channel switched");
                }
                None => {
                    let keep = match self.policy {
                        MarkerPolicy::PerFragment => 0,
                        MarkerPolicy::HoldBack => partial_marker_suffix(rest, marker),
                    };
                    let split = rest.len() - keep;
                    delta.push(self.channel, &rest[..split]);
                    self.held = rest[split..].to_string();
                    break;
                }
            }
        }

        delta
    }

    /// End of input: release any held-back text into the current channel.
    ///
    /// Always empty under [`MarkerPolicy::PerFragment`].
    pub fn finish(&mut self) -> ChannelDelta {
        let mut delta = ChannelDelta::default();
        let held = std::mem::take(&mut self.held);
        delta.push(self.channel, &held);
        delta
    }
}

/// Length of the longest suffix of `text` that is a proper prefix of `marker`.
///
/// Markers are ASCII, so the returned split point is always a char boundary.
fn partial_marker_suffix(text: &str, marker: &str) -> usize {
    let bytes = text.as_bytes();
    let max = (marker.len() - 1).min(bytes.len());
    (1..=max)
        .rev()
        .find(|&len| marker.as_bytes().starts_with(&bytes[bytes.len() - len..]))
        .unwrap_or(0)
}

/// Cumulative text of both channels.
///
/// Grows append-only while a response streams; a renderer can re-render both
/// fields in full after every update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOutput {
    pub reasoning: String,
    pub answer: String,
}

impl ChannelOutput {
    pub fn new(reasoning: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            reasoning: reasoning.into(),
            answer: answer.into(),
        }
    }

    /// Append a fragment's contribution.
    pub fn apply(&mut self, delta: ChannelDelta) {
        self.reasoning.push_str(&delta.reasoning);
        self.answer.push_str(&delta.answer);
    }

    pub fn is_empty(&self) -> bool {
        self.reasoning.is_empty() && self.answer.is_empty()
    }

    /// Storage form of a completed reply: `<think>{reasoning}</think>{answer}`.
    ///
    /// Marker text occurring inside either channel is not escaped.
    pub fn to_persisted(&self) -> String {
        format!(
            "{OPEN_MARKER}{}{CLOSE_MARKER}{}",
            self.reasoning, self.answer
        )
    }

    /// Decode a stored message in one pass.
    ///
    /// The reasoning is the text between the first `<think>` and the first
    /// `</think>` after it; the answer is everything after that. Content
    /// without a complete marker pair is answer-only.
    pub fn from_persisted(content: &str) -> Self {
        Self::parse_persisted(content).unwrap_or_else(|| Self::new("", content))
    }

    /// Like [`from_persisted`](Self::from_persisted), but `None` when the
    /// content has no complete marker pair.
    pub fn parse_persisted(content: &str) -> Option<Self> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"(?s)<think>(.*?)</think>(.*)").expect("marker pattern is valid")
        });

        pattern
            .captures(content)
            .map(|caps| Self::new(&caps[1], &caps[2]))
    }

    /// Both channels with surrounding whitespace removed, for display.
    pub fn trimmed(&self) -> Self {
        Self::new(self.reasoning.trim(), self.answer.trim())
    }
}
