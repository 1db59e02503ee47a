//! The turn-processing pipeline.
//!
//! Single-shot: `Start → Complete → Done`, one streamed call over the
//! assembled context.
//!
//! Fusion: `Start → Summarize → Analyze(Logical ∥ Creative) → Synthesize → Done`.
//! The digest produced by Summarize is the only context the two Analyze
//! calls see; Synthesize sees the persona plus all three stage outputs.
//!
//! Any stage failure aborts the turn and nothing is logged.

use archie_config::{AppConfig, ModelsConfig};
use archie_core::error::{Error, ProviderError};
use archie_core::message::Message;
use archie_core::persona::Persona;
use archie_core::provider::{FragmentSink, Provider, ProviderRequest};
use archie_memory::{ConversationLog, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{AssembledContext, ContextAssembler, TokenBudget};
use crate::prompt;

/// Fixed per-stage call parameters.
#[derive(Debug, Clone, Copy)]
pub struct StageParams {
    pub instruction: &'static str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// The persona system message doubles as the instruction here.
pub const SINGLE_SHOT: StageParams = StageParams {
    instruction: "",
    temperature: 0.6,
    max_tokens: 1024,
    stream: true,
};

pub const SUMMARIZE: StageParams = StageParams {
    instruction: "Summarise the dialogue so far.",
    temperature: 0.4,
    max_tokens: 512,
    stream: false,
};

pub const LOGICAL: StageParams = StageParams {
    instruction: "Answer logically.",
    temperature: 0.2,
    max_tokens: 512,
    stream: false,
};

pub const CREATIVE: StageParams = StageParams {
    instruction: "Answer creatively.",
    temperature: 0.9,
    max_tokens: 512,
    stream: false,
};

pub const SYNTHESIZE: StageParams = StageParams {
    instruction: "Combine the information inside the tags into one balanced answer.",
    temperature: 0.55,
    max_tokens: 1024,
    stream: true,
};

impl StageParams {
    /// `instruction` as a leading system message, then `dialogue`.
    pub fn request(&self, model: &str, dialogue: Vec<Message>) -> ProviderRequest {
        ProviderRequest::new(model, self.instruction, dialogue)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .streaming(self.stream)
    }
}

/// How a turn is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    SingleShot,
    Fusion,
}

impl Mode {
    pub fn from_fusion(fusion: bool) -> Self {
        if fusion { Self::Fusion } else { Self::SingleShot }
    }
}

/// States a turn passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    Start,
    Complete,
    Summarize,
    Analyze,
    Synthesize,
    Done,
}

/// The result of a successful turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: String,
    pub mode: Mode,
    /// Stages traversed, in order
    pub stages: Vec<TurnStage>,
    /// Whether the turn reached the conversation log
    pub logged: bool,
}

/// Drives one user turn end to end.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    log: Arc<ConversationLog>,
    memory: Arc<VectorStore>,
    assembler: ContextAssembler,
    models: ModelsConfig,
    recall_limit: usize,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        log: Arc<ConversationLog>,
        memory: Arc<VectorStore>,
        models: ModelsConfig,
    ) -> Self {
        Self {
            provider,
            log,
            memory,
            assembler: ContextAssembler::new(TokenBudget::default()),
            models,
            recall_limit: 3,
        }
    }

    /// Build from the startup configuration.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        log: Arc<ConversationLog>,
        memory: Arc<VectorStore>,
    ) -> Self {
        Self::new(provider, log, memory, config.models.clone())
            .with_budget(TokenBudget {
                context_window: config.context_window_tokens,
                response_reserve: config.response_reserve_tokens,
            })
            .with_recall_limit(config.recall_limit)
    }

    pub fn with_budget(mut self, budget: TokenBudget) -> Self {
        self.assembler = ContextAssembler::new(budget);
        self
    }

    /// Set the maximum number of memories to recall per turn.
    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit;
        self
    }

    /// Assemble the context for `prompt` from persona, recalled memories
    /// and today's log.
    pub async fn assemble(&self, persona: &Persona, prompt: &str) -> Result<AssembledContext, Error> {
        let memories = self.memory.query(prompt, self.recall_limit).await;
        if !memories.is_empty() {
            debug!(count = memories.len(), "Recalled memories for context");
        }
        let history = self.log.history(ConversationLog::today()).await?;
        let context = self.assembler.build(
            &prompt::persona_prompt(persona),
            &history,
            &memories,
            prompt,
        );
        debug!(
            tokens = context.metadata.total_tokens,
            history = context.metadata.history_kept,
            "Context assembled"
        );
        Ok(context)
    }

    /// Answer `prompt`, streaming live fragments of the final stage to `sink`,
    /// then append the turn to today's log.
    pub async fn run_turn(
        &self,
        persona: &Persona,
        prompt: &str,
        mode: Mode,
        sink: FragmentSink,
    ) -> Result<TurnOutcome, Error> {
        info!(?mode, "Processing turn");
        let mut stages = vec![TurnStage::Start];
        let context = self.assemble(persona, prompt).await?;

        let answer = match mode {
            Mode::SingleShot => self.single_shot(context, sink, &mut stages).await?,
            Mode::Fusion => self.fusion(context, prompt, sink, &mut stages).await?,
        };
        stages.push(TurnStage::Done);

        let logged = match self.log.append(prompt, &answer).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Answer produced but the turn could not be logged");
                false
            }
        };

        info!(?mode, chars = answer.len(), "Turn complete");
        Ok(TurnOutcome {
            answer,
            mode,
            stages,
            logged,
        })
    }

    async fn single_shot(
        &self,
        context: AssembledContext,
        sink: FragmentSink,
        stages: &mut Vec<TurnStage>,
    ) -> Result<String, ProviderError> {
        stages.push(TurnStage::Complete);
        let request = ProviderRequest::from_messages(&self.models.exec, context.messages)
            .with_temperature(SINGLE_SHOT.temperature)
            .with_max_tokens(SINGLE_SHOT.max_tokens)
            .streaming(SINGLE_SHOT.stream);
        self.provider.send(request, sink).await
    }

    async fn fusion(
        &self,
        context: AssembledContext,
        prompt: &str,
        sink: FragmentSink,
        stages: &mut Vec<TurnStage>,
    ) -> Result<String, ProviderError> {
        let persona_system = context.system().clone();

        stages.push(TurnStage::Summarize);
        let digest = self
            .provider
            .send(
                SUMMARIZE.request(&self.models.summarise, context.messages),
                FragmentSink::discard(),
            )
            .await?;
        debug!(chars = digest.len(), "Dialogue summarised");

        stages.push(TurnStage::Analyze);
        let analysis = vec![
            Message::system(prompt::memory_block(&digest)),
            Message::user(prompt),
        ];
        let (logical, creative) = tokio::try_join!(
            self.provider.send(
                LOGICAL.request(&self.models.logic, analysis.clone()),
                FragmentSink::discard(),
            ),
            self.provider.send(
                CREATIVE.request(&self.models.creative, analysis),
                FragmentSink::discard(),
            ),
        )?;
        debug!(
            logical = logical.len(),
            creative = creative.len(),
            "Drafts ready"
        );

        stages.push(TurnStage::Synthesize);
        let synthesis = vec![
            persona_system,
            Message::system(prompt::fusion_block(&digest, &logical, &creative)),
            Message::user(prompt),
        ];
        self.provider
            .send(SYNTHESIZE.request(&self.models.exec, synthesis), sink)
            .await
    }
}
