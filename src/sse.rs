//! Server-Sent Events (SSE) stream processing utilities.
//!
//! This module turns the raw byte chunks of a streamed chat-completions
//! response into content deltas.
//!
//! SSE format:
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Chunks arrive at arbitrary boundaries: a record, or a multi-byte UTF-8
//! character, may be split across any number of chunks. [`SseDecoder`] keeps
//! the partial state between chunks so that re-chunking the same bytes always
//! yields the same records.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::splitter::{ChannelOutput, MarkerPolicy};
use crate::stream::channel_stream;

const DATA_PREFIX: &str = "data: ";
const REPLACEMENT: char = '\u{FFFD}';

/// Extension trait for `reqwest::Response` to enable SSE streaming.
///
/// # Example
/// ```ignore
/// use thinkchat::sse::SSEResponseExt;
///
/// let response = client.post(url).json(&body).send().await?;
///
/// let mut stream = response.sse();
/// while let Some(result) = stream.next().await {
///     let data = result?;
///     println!("SSE data: {}", data);
/// }
/// ```
pub trait SSEResponseExt {
    /// Convert the response into a stream of raw SSE data payloads.
    ///
    /// Returns the content after the `data: ` prefix for each complete line.
    /// `[DONE]` sentinels and non-data lines are skipped; the stream ends when
    /// the body ends.
    fn sse(self) -> impl Stream<Item = Result<String, ClientError>> + Send;

    /// Convert the response into a stream of cumulative reasoning/answer
    /// snapshots, one per chunk that added text.
    fn channels(
        self,
        policy: MarkerPolicy,
    ) -> impl Stream<Item = Result<ChannelOutput, ClientError>> + Send;
}

impl SSEResponseExt for reqwest::Response {
    fn sse(self) -> impl Stream<Item = Result<String, ClientError>> + Send {
        sse_stream(self.bytes_stream().map(|chunk| chunk.map_err(ClientError::from)))
    }

    fn channels(
        self,
        policy: MarkerPolicy,
    ) -> impl Stream<Item = Result<ChannelOutput, ClientError>> + Send {
        channel_stream(
            self.bytes_stream().map(|chunk| chunk.map_err(ClientError::from)),
            policy,
        )
    }
}

/// Turn any byte-chunk stream into a stream of SSE data payloads.
///
/// Used by [`SSEResponseExt::sse`]; also accepts recorded or synthetic
/// bodies. A chunk error is yielded once and ends the stream.
pub fn sse_stream<S>(byte_stream: S) -> impl Stream<Item = Result<String, ClientError>> + Send
where
    S: Stream<Item = Result<Bytes, ClientError>> + Send,
{
    stream::unfold(
        (Box::pin(byte_stream), SseDecoder::new(), Vec::new().into_iter(), false),
        |(mut byte_stream, mut decoder, mut ready, mut stream_ended)| async move {
            loop {
                if let Some(data) = ready.next() {
                    return Some((Ok(data), (byte_stream, decoder, ready, stream_ended)));
                }

                if stream_ended {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(chunk)) => {
                        ready = decoder.push(&chunk).into_iter();
                    }
                    Some(Err(e)) => {
                        stream_ended = true;
                        return Some((Err(e), (byte_stream, decoder, ready, stream_ended)));
                    }
                    None => {
                        // Body ended; a trailing partial line is not a record.
                        stream_ended = true;
                        decoder.finish();
                    }
                }
            }
        },
    )
}

/// Incremental UTF-8 decoder.
///
/// Bytes of a character that is not yet complete are kept until the next
/// chunk. Invalid sequences are replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, appending the text to `out`.
    pub fn decode_into(&mut self, chunk: &[u8], out: &mut String) {
        self.pending.extend_from_slice(chunk);

        let mut input = self.pending.as_slice();
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = input.split_at(e.valid_up_to());
                    // `valid_up_to` guarantees this prefix is valid UTF-8.
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            input = &after[len..];
                        }
                        // Incomplete character at the end; wait for more bytes.
                        None => {
                            input = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = input.to_vec();
    }

    /// End of input: a dangling incomplete character becomes U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(REPLACEMENT);
        }
    }
}

/// Splits decoded text into newline-terminated lines and extracts SSE data
/// payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    utf8: Utf8Decoder,
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the data payloads of every line it
    /// completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.utf8.decode_into(chunk, &mut self.buffer);

        let mut payloads = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buffer[start..].find('\n') {
            if let Some(data) = parse_sse_line(&self.buffer[start..start + pos]) {
                if !is_done_marker(data) {
                    payloads.push(data.to_string());
                }
            }
            start += pos + 1;
        }
        // Consumed lines are cut once per chunk.
        self.buffer.drain(..start);
        payloads
    }

    /// End of stream. Completes decoding state and discards any unterminated
    /// trailing line.
    pub fn finish(&mut self) {
        self.utf8.finish(&mut self.buffer);
        if !self.buffer.trim().is_empty() {
            debug!(bytes = self.buffer.len(), "discarding unterminated trailing line");
        }
        self.buffer.clear();
    }

    /// Text received but not yet terminated by a newline.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Parse an SSE line to extract the data portion.
///
/// The line is trimmed first, so `\r\n` endings and indentation are
/// tolerated.
///
/// # Example
/// ```
/// use thinkchat::sse::parse_sse_line;
///
/// let line = "data: {\"key\": \"value\"}";
/// assert_eq!(parse_sse_line(line), Some("{\"key\": \"value\"}"));
///
/// let line = "event: ping";
/// assert_eq!(parse_sse_line(line), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.trim().strip_prefix(DATA_PREFIX)
}

/// Check if an SSE data payload is the completion sentinel.
///
/// # Example
/// ```
/// use thinkchat::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker(""));
/// assert!(!is_done_marker("{\"data\": \"value\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data == "[DONE]"
}

/// Extract the content delta from one data payload.
///
/// Returns `choices[0].delta.content` when present and non-empty. A malformed
/// payload is logged and yields `None`; it never fails the stream.
///
/// # Example
/// ```
/// use thinkchat::sse::extract_delta;
///
/// let data = r#"{"choices":[{"delta":{"content":"Hi"}}]}"#;
/// assert_eq!(extract_delta(data), Some("Hi".to_string()));
/// assert_eq!(extract_delta("{not json"), None);
/// ```
pub fn extract_delta(data: &str) -> Option<String> {
    match serde_json::from_str::<ChatCompletionChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty()),
        Err(e) => {
            warn!(error = %e, data, "skipping malformed stream record");
            None
        }
    }
}

// --- Chat Completions Streaming Types ---

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}
