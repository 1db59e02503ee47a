//! LLM provider implementations for archie.
//!
//! All providers implement the `archie_core::Provider` trait. Only the
//! OpenAI-compatible wire format is spoken; the SSE reader is kept separate
//! so it can be driven by any byte stream.

pub mod openai_compat;
pub mod sse;

pub use openai_compat::OpenAiCompatProvider;
pub use sse::read_event_stream;
