//! Shared test helpers for pipeline and digest tests.

use archie_core::error::ProviderError;
use archie_core::provider::{EmbeddingRequest, Provider, ProviderRequest};
use std::sync::Mutex;

/// A mock provider that answers by stage instruction and records every call.
///
/// A request is routed by the content of its first message; anything
/// without a matching route gets the fallback reply.
pub struct ScriptedProvider {
    routes: Vec<(String, Result<String, ProviderError>)>,
    fallback: Result<String, ProviderError>,
    embedding: Option<Vec<f32>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(fallback: &str) -> Self {
        Self {
            routes: Vec::new(),
            fallback: Ok(fallback.to_string()),
            embedding: Some(vec![1.0, 0.5, 0.25]),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply `text` to requests whose first message is `instruction`.
    pub fn route(mut self, instruction: &str, text: &str) -> Self {
        self.routes.push((instruction.to_string(), Ok(text.to_string())));
        self
    }

    /// Fail requests whose first message is `instruction`.
    pub fn fail(mut self, instruction: &str, error: ProviderError) -> Self {
        self.routes.push((instruction.to_string(), Err(error)));
        self
    }

    pub fn fail_fallback(mut self, error: ProviderError) -> Self {
        self.fallback = Err(error);
        self
    }

    pub fn without_embeddings(mut self) -> Self {
        self.embedding = None;
        self
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The recorded request whose first message is `instruction`.
    pub fn request_for(&self, instruction: &str) -> Option<ProviderRequest> {
        self.requests()
            .into_iter()
            .find(|r| r.messages.first().is_some_and(|m| m.content() == instruction))
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<String, ProviderError> {
        let first = request
            .messages
            .first()
            .map(|m| m.content().to_string())
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);

        self.routes
            .iter()
            .find(|(instruction, _)| *instruction == first)
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn embed(&self, _request: EmbeddingRequest) -> Result<Vec<f32>, ProviderError> {
        self.embedding.clone().ok_or_else(|| ProviderError::Remote {
            status_code: 503,
            message: "embeddings unavailable".into(),
        })
    }
}
