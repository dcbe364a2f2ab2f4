//! Property-based tests: stream reading and channel splitting invariants.

use proptest::prelude::*;
use thinkchat::splitter::{ChannelOutput, MarkerPolicy, MarkerSplitter, CLOSE_MARKER, OPEN_MARKER};
use thinkchat::sse::{extract_delta, SseDecoder};
use thinkchat::stream::StreamSession;

fn record(content: &str) -> String {
    format!(
        "data: {}\n",
        serde_json::json!({ "choices": [{ "delta": { "content": content } }] })
    )
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,\n]{0,12}|[éжλ✓🙂]{1,4}"
}

/// Deltas built from plain text and whole markers, never a marker fragment.
fn arb_delta() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => arb_text(),
            1 => Just(OPEN_MARKER.to_string()),
            1 => Just(CLOSE_MARKER.to_string()),
        ],
        1..5,
    )
    .prop_map(|pieces| pieces.concat())
}

/// Text that may contain markers and loose `<`, `/` and `>` characters.
fn arb_marked_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            3 => arb_text(),
            1 => Just(OPEN_MARKER.to_string()),
            1 => Just(CLOSE_MARKER.to_string()),
            1 => "[<>/a-z]{1,4}",
        ],
        0..10,
    )
    .prop_map(|pieces| pieces.concat())
}

fn split_once(text: &str) -> ChannelOutput {
    let mut splitter = MarkerSplitter::new();
    let mut output = ChannelOutput::default();
    output.apply(splitter.push(text));
    output
}

/// Cut `text` at the given byte offsets, snapped forward to char boundaries.
fn cut<'a>(text: &'a str, mut offsets: Vec<usize>) -> Vec<&'a str> {
    offsets.iter_mut().for_each(|o| {
        *o = (*o).min(text.len());
        while !text.is_char_boundary(*o) {
            *o += 1;
        }
    });
    offsets.sort_unstable();

    let mut pieces = Vec::new();
    let mut start = 0;
    for offset in offsets {
        pieces.push(&text[start..offset]);
        start = offset;
    }
    pieces.push(&text[start..]);
    pieces
}

proptest! {
    #[test]
    fn rechunked_body_yields_same_deltas(
        deltas in proptest::collection::vec(arb_delta(), 0..8),
        chunk_size in 1usize..40,
    ) {
        let mut body: String = deltas.iter().map(|d| record(d)).collect();
        body.push_str("data: [DONE]\n");

        let mut whole = SseDecoder::new();
        let expected: Vec<String> = whole
            .push(body.as_bytes())
            .iter()
            .filter_map(|data| extract_delta(data))
            .collect();

        let mut chunked = SseDecoder::new();
        let mut actual = Vec::new();
        for chunk in body.as_bytes().chunks(chunk_size) {
            actual.extend(chunked.push(chunk).iter().filter_map(|data| extract_delta(data)));
        }
        chunked.finish();

        let non_empty: Vec<&String> = deltas.iter().filter(|d| !d.is_empty()).collect();
        prop_assert_eq!(&actual, &expected);
        prop_assert_eq!(actual.iter().collect::<Vec<_>>(), non_empty);
    }

    #[test]
    fn whole_marker_deltas_match_single_pass(
        deltas in proptest::collection::vec(arb_delta(), 0..8),
    ) {
        let mut session = StreamSession::new();
        for delta in &deltas {
            session.push_delta(delta);
        }
        session.finish();

        let joined = deltas.concat();
        let reference = split_once(&joined);
        prop_assert_eq!(session.output(), &reference);

        let marker_bytes = joined.matches(OPEN_MARKER).count() * OPEN_MARKER.len()
            + joined.matches(CLOSE_MARKER).count() * CLOSE_MARKER.len();
        let output = session.output();
        prop_assert!(!output.answer.contains(OPEN_MARKER));
        prop_assert!(!output.reasoning.contains(CLOSE_MARKER));
        prop_assert!(output.reasoning.len() + output.answer.len() <= joined.len());
        prop_assert!(output.reasoning.len() + output.answer.len() >= joined.len() - marker_bytes);
    }

    #[test]
    fn hold_back_is_boundary_independent(
        text in arb_marked_text(),
        offsets in proptest::collection::vec(0usize..200, 0..6),
    ) {
        let mut splitter = MarkerSplitter::with_policy(MarkerPolicy::HoldBack);
        let mut output = ChannelOutput::default();
        for piece in cut(&text, offsets) {
            output.apply(splitter.push(piece));
        }
        output.apply(splitter.finish());

        prop_assert_eq!(output, split_once(&text));
    }

    #[test]
    fn snapshots_only_grow(
        deltas in proptest::collection::vec(arb_delta(), 1..8),
    ) {
        let mut session = StreamSession::new();
        let mut previous = ChannelOutput::default();
        for delta in &deltas {
            let current = session.push_delta(delta).clone();
            prop_assert!(current.reasoning.starts_with(&previous.reasoning));
            prop_assert!(current.answer.starts_with(&previous.answer));
            previous = current;
        }
    }

    #[test]
    fn persisted_round_trip(
        reasoning in "[a-z <>/\n]{0,30}",
        answer in "[a-z <>/\n]{0,30}",
    ) {
        prop_assume!(!reasoning.contains(OPEN_MARKER) && !reasoning.contains(CLOSE_MARKER));
        prop_assume!(!answer.contains(OPEN_MARKER) && !answer.contains(CLOSE_MARKER));

        let output = ChannelOutput::new(reasoning, answer);
        prop_assert_eq!(ChannelOutput::from_persisted(&output.to_persisted()), output);
    }
}
