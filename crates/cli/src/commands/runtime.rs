//! Wiring shared by the commands that talk to the model.

use archie_agent::{DigestJob, Mode, Orchestrator, TurnOutcome};
use archie_config::{AppConfig, PersonaStore, StateStore};
use archie_core::provider::{FragmentSink, Provider};
use archie_memory::{ConversationLog, VectorStore};
use archie_providers::OpenAiCompatProvider;
use std::io::Write;
use std::sync::Arc;
use tracing::warn;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn load_config() -> CliResult<AppConfig> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub struct Runtime {
    pub config: AppConfig,
    pub memory: Arc<VectorStore>,
    pub persona: PersonaStore,
    orchestrator: Orchestrator,
    digest: Arc<DigestJob>,
}

impl Runtime {
    /// Load config and connect to the endpoint; a missing credential is fatal.
    pub fn load() -> CliResult<Self> {
        let config = load_config()?;
        if config.require_api_key().is_err() {
            eprintln!();
            eprintln!("  ERROR: No API key configured!");
            eprintln!();
            eprintln!("  Set one of these environment variables:");
            eprintln!("    OPENAI_API_KEY = 'sk-...'");
            eprintln!("    ARCHIE_API_KEY = 'sk-...'");
            eprintln!();
            eprintln!("  Or add `api_key` to your config file:");
            eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
            eprintln!();
        }
        config.require_api_key()?;

        let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::from_config(&config)?);
        Ok(Self::with_provider(config, provider))
    }

    pub fn with_provider(config: AppConfig, provider: Arc<dyn Provider>) -> Self {
        let log = Arc::new(ConversationLog::new(config.log_dir()));
        let memory = Arc::new(VectorStore::new(
            config.memory_path(),
            provider.clone(),
            &config.models.embedding,
        ));
        let orchestrator =
            Orchestrator::from_config(&config, provider.clone(), log.clone(), memory.clone());
        let digest = Arc::new(DigestJob::new(
            provider,
            log.clone(),
            memory.clone(),
            StateStore::new(config.state_path()),
            &config.models.summarise,
        ));
        Self {
            persona: PersonaStore::new(config.persona_path()),
            config,
            memory,
            orchestrator,
            digest,
        }
    }

    pub fn digest_job(&self) -> &DigestJob {
        &self.digest
    }

    pub fn mode(&self, fusion_flag: bool) -> Mode {
        Mode::from_fusion(fusion_flag || self.config.fusion)
    }

    /// Run one turn, printing fragments as they arrive, then digest any
    /// finished day before returning.
    pub async fn turn(&self, prompt: &str, mode: Mode) -> CliResult<TurnOutcome> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        let printer = tokio::spawn(async move {
            let mut stdout = std::io::stdout();
            while let Some(fragment) = rx.recv().await {
                let _ = write!(stdout, "{fragment}");
                let _ = stdout.flush();
            }
        });

        let persona = self.persona.get();
        let result = self
            .orchestrator
            .run_turn(&persona, prompt, mode, FragmentSink::new(tx))
            .await;
        if let Err(e) = printer.await {
            warn!(error = %e, "Output task failed");
        }
        println!();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(archie_core::Error::Provider(e)) if e.is_partial() => {
                eprintln!("  [stream interrupted; the partial answer above was not saved]");
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let digested = self
            .digest
            .clone()
            .spawn(ConversationLog::today())
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Digest task failed");
                0
            });
        tracing::debug!(digested, "Digest pass finished");

        Ok(outcome)
    }
}
