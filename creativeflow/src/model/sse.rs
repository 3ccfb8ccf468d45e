//! Decoding of OpenAI-style server-sent event streams.

use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use std::pin::Pin;

use super::FragmentStream;
use crate::errors::ModelError;

/// One meaningful line of a chat-completion event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseItem {
    /// A non-empty content delta.
    Fragment(String),
    /// The `[DONE]` sentinel.
    Done,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

/// Incremental line decoder for `data:` frames.
///
/// Bytes are buffered until a newline arrives, so multi-byte characters and
/// JSON payloads split across network chunks decode correctly.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Creates an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns the items on every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<SseItem, ModelError>> {
        self.buffer.extend_from_slice(chunk);
        let mut items = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(item) = decode_line(&line[..pos]) {
                items.push(item);
            }
        }
        items
    }

    /// Decodes whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<Result<SseItem, ModelError>> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest)
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<SseItem, ModelError>> {
    let line = match std::str::from_utf8(raw) {
        Ok(line) => line.trim_end_matches('\r'),
        Err(e) => return Some(Err(ModelError::malformed(format!("invalid UTF-8 in stream: {e}")))),
    };

    // Blank separators, comments and other fields carry no content.
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() {
        return None;
    }
    if payload == "[DONE]" {
        return Some(Ok(SseItem::Done));
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(|content| Ok(SseItem::Fragment(content))),
        Err(e) => Some(Err(ModelError::malformed(format!("invalid stream chunk: {e}")))),
    }
}

struct SseState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, ModelError>>,
    finished: bool,
}

impl<S> SseState<S> {
    /// Queues decoded items, marking the stream finished at `[DONE]` or an error.
    fn enqueue(&mut self, items: impl IntoIterator<Item = Result<SseItem, ModelError>>) {
        for item in items {
            match item {
                Ok(SseItem::Fragment(text)) => self.pending.push_back(Ok(text)),
                Ok(SseItem::Done) => {
                    self.finished = true;
                    return;
                }
                Err(e) => {
                    self.pending.push_back(Err(e));
                    self.finished = true;
                    return;
                }
            }
        }
    }
}

/// Turns a raw response body into a stream of content fragments.
///
/// The stream ends at `[DONE]`, at the end of the body, or right after the
/// first error.
pub fn sse_fragments<S, B>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, ModelError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let items = state.decoder.push(chunk.as_ref());
                    state.enqueue(items);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    let rest = state.decoder.finish();
                    state.enqueue(rest);
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
