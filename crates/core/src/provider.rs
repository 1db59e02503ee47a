//! Provider trait, the abstraction over the remote completion endpoint.
//!
//! A Provider knows how to send a dialogue to an LLM and get the answer
//! back, either buffered or as a stream of text fragments, and how to embed
//! text for similarity search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::error::ProviderError;
use crate::message::Message;

/// A single completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model to use (e.g., "gpt-4o")
    pub model: String,

    /// The full dialogue, system message first
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Whether to stream the response
    #[serde(default)]
    pub stream: bool,
}

impl ProviderRequest {
    /// The system instruction followed by the dialogue.
    pub fn new(
        model: impl Into<String>,
        instruction: impl Into<String>,
        dialogue: Vec<Message>,
    ) -> Self {
        let mut messages = Vec::with_capacity(dialogue.len() + 1);
        messages.push(Message::system(instruction));
        messages.extend(dialogue);
        Self::from_messages(model, messages)
    }

    /// A request over an already-assembled dialogue.
    pub fn from_messages(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 0.7,
            max_tokens: 1024,
            stream: false,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn streaming(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "text-embedding-3-small").
    pub model: String,

    /// The text to embed.
    pub input: String,
}

/// Where live text fragments go while a stream is consumed.
///
/// Emitting never blocks: the channel is unbounded and a receiver that
/// has been dropped (or was never attached) is simply ignored.
#[derive(Debug, Clone, Default)]
pub struct FragmentSink {
    tx: Option<UnboundedSender<String>>,
}

impl FragmentSink {
    pub fn new(tx: UnboundedSender<String>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that discards every fragment.
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, fragment: &str) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(fragment.to_string());
        }
    }
}

/// The core Provider trait.
///
/// The orchestration pipeline calls `send()` without knowing which backend
/// is answering: the OpenAI-compatible client in production or a scripted
/// mock in tests.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and wait for the complete response text.
    async fn complete(&self, request: ProviderRequest) -> Result<String, ProviderError>;

    /// Send a request and consume the answer incrementally, surfacing each
    /// fragment through `sink` and returning the concatenated text.
    ///
    /// Default implementation calls `complete()` and emits the result as a
    /// single fragment.
    async fn stream(
        &self,
        request: ProviderRequest,
        sink: FragmentSink,
    ) -> Result<String, ProviderError> {
        let text = self.complete(request).await?;
        sink.emit(&text);
        Ok(text)
    }

    /// Embed a text into a fixed-length vector.
    ///
    /// Default implementation returns an error indicating embeddings aren't supported.
    async fn embed(&self, _request: EmbeddingRequest) -> Result<Vec<f32>, ProviderError> {
        Err(ProviderError::NotConfigured(format!(
            "Provider '{}' does not support embeddings",
            self.name()
        )))
    }

    /// Dispatch on `request.stream`.
    async fn send(
        &self,
        request: ProviderRequest,
        sink: FragmentSink,
    ) -> Result<String, ProviderError> {
        if request.stream {
            self.stream(request, sink).await
        } else {
            self.complete(request).await
        }
    }
}
