//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing `/v1/chat/completions` and
//! `/v1/embeddings` (OpenRouter, vLLM, Ollama, LiteLLM, ...).
//!
//! Supports:
//! - Chat completions (buffered and streaming SSE)
//! - Embeddings

use std::time::Duration;

use archie_config::AppConfig;
use archie_core::error::ProviderError;
use archie_core::message::Message;
use archie_core::provider::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::sse::read_event_stream;

/// Fixed sampling parameters sent with every completion request.
pub const TOP_P: f32 = 0.96;
pub const FREQUENCY_PENALTY: f32 = 0.3;
pub const PRESENCE_PENALTY: f32 = 0.0;

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    ///
    /// `base_url` is the endpoint root, without the `/v1` segment.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build from the startup configuration. Fails when no credential is set.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .require_api_key()
            .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;
        Self::new(
            "openai",
            &config.api_base,
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    fn chat_body<'a>(request: &'a ProviderRequest, stream: bool) -> ChatBody<'a> {
        ChatBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            top_p: TOP_P,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
            stream,
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        accept: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", accept)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Provider returned error");
            return Err(ProviderError::Remote {
                status_code: status.as_u16(),
                message: error_body,
            });
        }
        Ok(response)
    }
}

/// Map a reqwest failure, distinguishing timeouts.
fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

#[async_trait]
impl archie_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let body = Self::chat_body(&request, false);
        let response = self
            .post(&self.completions_url(), &body, "application/json")
            .await?;
        let raw = response.text().await.map_err(transport_error)?;

        let api_response: ApiResponse = serde_json::from_str(&raw)
            .map_err(|e| ProviderError::Decode(format!("completion response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn stream(
        &self,
        request: ProviderRequest,
        sink: FragmentSink,
    ) -> Result<String, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let body = Self::chat_body(&request, true);
        let response = self
            .post(&self.completions_url(), &body, "text/event-stream")
            .await?;

        read_event_stream(response.bytes_stream(), &sink, transport_error).await
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<Vec<f32>, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending embedding request");

        let response = self
            .post(&self.embeddings_url(), &request, "application/json")
            .await?;
        let raw = response.text().await.map_err(transport_error)?;

        let api_resp: EmbeddingApiResponse = serde_json::from_str(&raw)
            .map_err(|e| ProviderError::Decode(format!("embedding response: {e}")))?;

        api_resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or(ProviderError::EmptyResponse)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}
