//! Streaming support types and utilities.
//!
//! A [`StreamSession`] owns everything one in-flight reply needs: the SSE
//! line buffer, the marker splitter, and the cumulative [`ChannelOutput`].
//! It is created per request and dropped when the reply ends, fails or is
//! abandoned. [`channel_stream`] drives a session from an async byte stream.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::client::ClientError;
use crate::splitter::{ChannelOutput, MarkerPolicy, MarkerSplitter};
use crate::sse::{extract_delta, SseDecoder};

pub use crate::sse::{is_done_marker, parse_sse_line};

/// Parsing state of a single streamed reply.
#[derive(Debug, Default)]
pub struct StreamSession {
    decoder: SseDecoder,
    splitter: MarkerSplitter,
    output: ChannelOutput,
}

impl StreamSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MarkerPolicy) -> Self {
        Self {
            splitter: MarkerSplitter::with_policy(policy),
            ..Self::default()
        }
    }

    /// Feed one raw body chunk.
    ///
    /// Returns the updated output when the chunk contributed text to either
    /// channel, `None` otherwise.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Option<&ChannelOutput> {
        let mut changed = false;
        for data in self.decoder.push(chunk) {
            if let Some(delta) = extract_delta(&data) {
                changed |= self.push_delta_inner(&delta);
            }
        }
        changed.then_some(&self.output)
    }

    /// Feed one content delta directly, bypassing the wire decoding.
    pub fn push_delta(&mut self, delta: &str) -> &ChannelOutput {
        self.push_delta_inner(delta);
        &self.output
    }

    fn push_delta_inner(&mut self, delta: &str) -> bool {
        let split = self.splitter.push(delta);
        let changed = !split.is_empty();
        self.output.apply(split);
        changed
    }

    /// End of body. Flushes decoder and splitter state.
    ///
    /// Returns `true` when the flush added text to the output.
    pub fn finish(&mut self) -> bool {
        self.decoder.finish();
        let tail = self.splitter.finish();
        let changed = !tail.is_empty();
        self.output.apply(tail);
        debug!(
            reasoning_len = self.output.reasoning.len(),
            answer_len = self.output.answer.len(),
            "stream session finished"
        );
        changed
    }

    /// Cumulative output so far.
    pub fn output(&self) -> &ChannelOutput {
        &self.output
    }

    /// Whether the splitter is inside a reasoning block.
    pub fn in_reasoning(&self) -> bool {
        self.splitter.in_reasoning()
    }

    pub fn into_output(self) -> ChannelOutput {
        self.output
    }
}

/// Drive a [`StreamSession`] from a byte-chunk stream.
///
/// Yields a snapshot of the cumulative output every time a chunk adds text.
/// A chunk error is yielded once and ends the stream; snapshots already
/// yielded stand.
pub fn channel_stream<S>(
    byte_stream: S,
    policy: MarkerPolicy,
) -> impl Stream<Item = Result<ChannelOutput, ClientError>> + Send
where
    S: Stream<Item = Result<Bytes, ClientError>> + Send,
{
    stream::unfold(
        (Box::pin(byte_stream), Some(StreamSession::with_policy(policy))),
        |(mut byte_stream, mut session)| async move {
            loop {
                let active = session.as_mut()?;
                match byte_stream.next().await {
                    Some(Ok(chunk)) => {
                        if let Some(output) = active.push_chunk(&chunk) {
                            let snapshot = output.clone();
                            return Some((Ok(snapshot), (byte_stream, session)));
                        }
                    }
                    Some(Err(e)) => {
                        debug!(error = %e, "stream aborted");
                        return Some((Err(e), (byte_stream, None)));
                    }
                    None => {
                        let mut finished = session.take()?;
                        if finished.finish() {
                            let snapshot = finished.into_output();
                            return Some((Ok(snapshot), (byte_stream, None)));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

/// Feed a recorded body through a fresh session in one go.
///
/// Convenience for replaying captured responses.
pub fn split_body(body: &[u8], policy: MarkerPolicy) -> ChannelOutput {
    let mut session = StreamSession::with_policy(policy);
    session.push_chunk(body);
    session.finish();
    session.into_output()
}
