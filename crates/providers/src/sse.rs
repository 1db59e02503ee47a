//! Server-sent-event reader for streamed chat completions.
//!
//! The body is a sequence of lines; `data: {...}` lines carry a partial
//! delta and `data: [DONE]` ends the stream. Everything else is ignored.

use archie_core::error::ProviderError;
use archie_core::provider::FragmentSink;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, trace};

/// End-of-stream sentinel payload.
pub const DONE_SENTINEL: &str = "[DONE]";

/// How a single line of the event stream is interpreted.
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    /// A `data:` payload to decode.
    Data(&'a str),
    /// The `[DONE]` sentinel.
    Done,
    /// Blank lines, comments, `event:`/`id:` fields.
    Ignored,
}

/// Classify one line (without its trailing newline).
pub fn classify_line(line: &str) -> SseLine<'_> {
    let line = line.trim_end_matches('\r');
    match line.strip_prefix("data:") {
        Some(data) => {
            let data = data.trim();
            if data == DONE_SENTINEL {
                SseLine::Done
            } else {
                SseLine::Data(data)
            }
        }
        None => SseLine::Ignored,
    }
}

/// Extract the text fragment from a `data:` payload.
///
/// `None` for malformed JSON or a chunk without choices; `Some("")` for an
/// empty delta.
pub fn delta_text(data: &str) -> Option<String> {
    let chunk: StreamResponse = serde_json::from_str(data).ok()?;
    let choice = chunk.choices.into_iter().next()?;
    Some(choice.delta.content.unwrap_or_default())
}

/// Consume an event stream, emitting each non-empty fragment to `sink` as it
/// arrives, and return the concatenated text.
///
/// Returns on `[DONE]` or when the stream closes. A transport error before
/// any fragment is mapped through `map_err`; after at least one fragment it
/// becomes [`ProviderError::StreamInterrupted`] carrying the partial text.
pub async fn read_event_stream<S, B, E>(
    stream: S,
    sink: &FragmentSink,
    map_err: impl Fn(E) -> ProviderError,
) -> Result<String, ProviderError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer: Vec<u8> = Vec::new();
    let mut answer = String::new();
    let mut fragments = 0usize;

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(b) => b,
            Err(e) => {
                let err = map_err(e);
                if fragments == 0 {
                    return Err(err);
                }
                return Err(ProviderError::StreamInterrupted {
                    partial: answer,
                    reason: err.to_string(),
                });
            }
        };
        buffer.extend_from_slice(bytes.as_ref());

        // Process complete lines; a partial line stays buffered
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            if ingest_line(&line, sink, &mut answer, &mut fragments) {
                debug!(fragments, "Stream finished with sentinel");
                return Ok(answer);
            }
        }
    }

    // Stream closed without a trailing newline or sentinel
    if !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer).into_owned();
        ingest_line(&line, sink, &mut answer, &mut fragments);
    }
    debug!(fragments, "Stream closed without sentinel");
    Ok(answer)
}

/// Returns `true` when the sentinel was seen.
fn ingest_line(line: &str, sink: &FragmentSink, answer: &mut String, fragments: &mut usize) -> bool {
    match classify_line(line) {
        SseLine::Done => true,
        SseLine::Ignored => false,
        SseLine::Data(data) => {
            match delta_text(data) {
                Some(text) if !text.is_empty() => {
                    sink.emit(&text);
                    answer.push_str(&text);
                    *fragments += 1;
                }
                Some(_) => {}
                None => trace!(data = %data, "Ignoring unparseable SSE chunk"),
            }
            false
        }
    }
}

// --- Streaming SSE types ---

/// A single SSE `data: {...}` chunk from a streaming response.
#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}
