//! Configuration loading, validation, and management for archie.
//!
//! Loads configuration from `~/.archie/config.toml` with environment
//! variable overrides. Validates all settings at startup. The resulting
//! [`AppConfig`] is built once and handed to every component; nothing reads
//! ambient global state after startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod stores;

pub use stores::{AppState, PersonaStore, StateStore};

/// The root configuration structure.
///
/// Maps directly to `~/.archie/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer credential for the completion and embedding endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Endpoint base; `/v1/chat/completions` and `/v1/embeddings` are appended
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Model used per pipeline stage
    #[serde(default)]
    pub models: ModelsConfig,

    /// Context window of the exec model
    #[serde(default = "default_context_window")]
    pub context_window_tokens: usize,

    /// Tokens held back for the answer when budgeting history
    #[serde(default = "default_response_reserve")]
    pub response_reserve_tokens: usize,

    /// Per-request timeout for the remote endpoint
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Digests recalled from vector memory per turn
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// Use the multi-stage fusion pipeline by default
    #[serde(default)]
    pub fusion: bool,

    /// Where logs, memory and state live (defaults to the config dir)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_exec_model")]
    pub exec: String,

    #[serde(default = "default_small_model")]
    pub logic: String,

    #[serde(default = "default_small_model")]
    pub creative: String,

    #[serde(default = "default_small_model")]
    pub summarise: String,

    #[serde(default = "default_embedding_model")]
    pub embedding: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            exec: default_exec_model(),
            logic: default_small_model(),
            creative: default_small_model(),
            summarise: default_small_model(),
            embedding: default_embedding_model(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.openai.com".into()
}
fn default_exec_model() -> String {
    "gpt-4o".into()
}
fn default_small_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_context_window() -> usize {
    128_000
}
fn default_response_reserve() -> usize {
    2048
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_recall_limit() -> usize {
    3
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_base", &self.api_base)
            .field("models", &self.models)
            .field("context_window_tokens", &self.context_window_tokens)
            .field("response_reserve_tokens", &self.response_reserve_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("recall_limit", &self.recall_limit)
            .field("fusion", &self.fusion)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.archie/config.toml).
    ///
    /// Environment variables override the file:
    /// - `ARCHIE_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `OPENAI_API_BASE`
    /// - `ARCHIE_MODEL` (exec model)
    /// - `ARCHIE_FUSION` (`1`/`true` enables fusion mode)
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with(&config_path, |key| std::env::var(key).ok())
    }

    /// Load `path`, apply overrides from `lookup`, then validate the result.
    pub fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("ARCHIE_API_KEY").or_else(|| non_empty("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(base) = non_empty("OPENAI_API_BASE") {
            self.api_base = base;
        }
        if let Some(model) = non_empty("ARCHIE_MODEL") {
            self.models.exec = model;
        }
        if let Some(flag) = non_empty("ARCHIE_FUSION") {
            self.fusion = matches!(flag.trim(), "1" | "true" | "yes" | "on");
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".archie")
    }

    /// Directory holding logs, memory and state.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(Self::config_dir)
    }

    /// Directory of per-day conversation logs.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    /// The vector memory snapshot file.
    pub fn memory_path(&self) -> PathBuf {
        self.data_dir().join("memory-vectors.json")
    }

    pub fn persona_path(&self) -> PathBuf {
        self.data_dir().join("persona.json")
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir().join("state.json")
    }

    /// The credential, or a fatal startup error when none was supplied.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.response_reserve_tokens >= self.context_window_tokens {
            return Err(ConfigError::ValidationError(
                "response_reserve_tokens must be smaller than context_window_tokens".into(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "request_timeout_secs must be > 0".into(),
            ));
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(ConfigError::ValidationError(format!(
                "api_base must be an http(s) URL, got '{}'",
                self.api_base
            )));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: default_api_base(),
            models: ModelsConfig::default(),
            context_window_tokens: default_context_window(),
            response_reserve_tokens: default_response_reserve(),
            request_timeout_secs: default_timeout_secs(),
            recall_limit: default_recall_limit(),
            fusion: false,
            data_dir: None,
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Failed to write {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("No API key configured: set OPENAI_API_KEY (or ARCHIE_API_KEY)")]
    MissingApiKey,
}
