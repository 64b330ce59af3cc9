//! Configuration loading, validation, and management for wordtutor.
//!
//! Loads configuration from `~/.wordtutor/config.toml`, then a `.env` file in
//! the working directory, then process environment variables. The model
//! endpoint variables (`BASE_URL`, `MODEL_API_KEY`, `MODEL_NAME`) are
//! required before any model call; [`AppConfig::require_model`] reports the
//! first one missing.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.wordtutor/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub tutor: TutorConfig,

    #[serde(default)]
    pub sessions: SessionConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// The hosted chat model.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// OpenAI-compatible API root, e.g. `https://api.example.com/v1`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Stream replies chunk by chunk where the transport supports it
    #[serde(default = "default_true")]
    pub streaming: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Secondary model tried when the primary fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupModelConfig>,
}

fn default_temperature() -> f32 {
    0.1
}
fn default_max_tokens() -> u32 {
    512
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_true() -> bool {
    true
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            name: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            streaming: true,
            timeout_secs: default_timeout_secs(),
            backup: None,
        }
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("name", &self.name)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("streaming", &self.streaming)
            .field("timeout_secs", &self.timeout_secs)
            .field("backup", &self.backup)
            .finish()
    }
}

/// Fallback model. Unset endpoint fields inherit from the primary.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackupModelConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for BackupModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupModelConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .finish()
    }
}

/// How the first assistant turn of a session is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GreetingMode {
    /// Render the fixed greeting line locally.
    #[default]
    Template,
    /// Send the empty start turn to the model and relay whatever it says.
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    /// Word used when a transport does not pick one
    #[serde(default = "default_word")]
    pub default_word: String,

    #[serde(default)]
    pub greeting: GreetingMode,

    /// Replaces the built-in instruction template. Must contain `{word}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Upper bound on model round-trips per turn when tools are called
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Expose the word tools to the model
    #[serde(default = "default_true")]
    pub tools_enabled: bool,
}

fn default_word() -> String {
    "apple".into()
}
fn default_max_tool_iterations() -> usize {
    5
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            default_word: default_word(),
            greeting: GreetingMode::default(),
            system_prompt: None,
            max_tool_iterations: default_max_tool_iterations(),
            tools_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Least-recently-used sessions are evicted past this count. 0 disables
    /// eviction.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_sessions() -> usize {
    1000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins. Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Local-document question answering.
#[derive(Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Directory of `.txt` / `.md` files indexed at startup
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding endpoint. Falls back to the chat model's endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_api_key: Option<String>,

    /// Chunks handed to the answer step
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Candidates considered before diversity re-ranking
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,

    /// Upper bound on characters per chunk
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from("docs")
}
fn default_embedding_model() -> String {
    "Pro/BAAI/bge-m3".into()
}
fn default_top_k() -> usize {
    5
}
fn default_fetch_k() -> usize {
    10
}
fn default_chunk_chars() -> usize {
    800
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            documents_dir: default_documents_dir(),
            embedding_model: default_embedding_model(),
            embedding_base_url: None,
            embedding_api_key: None,
            top_k: default_top_k(),
            fetch_k: default_fetch_k(),
            chunk_chars: default_chunk_chars(),
        }
    }
}

impl std::fmt::Debug for RetrievalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalConfig")
            .field("enabled", &self.enabled)
            .field("documents_dir", &self.documents_dir)
            .field("embedding_model", &self.embedding_model)
            .field("embedding_base_url", &self.embedding_base_url)
            .field("embedding_api_key", &redact(&self.embedding_api_key))
            .field("top_k", &self.top_k)
            .field("fetch_k", &self.fetch_k)
            .field("chunk_chars", &self.chunk_chars)
            .finish()
    }
}

/// Resolved endpoint for the chat model.
#[derive(Clone)]
pub struct ModelEndpoint {
    pub base_url: String,
    pub api_key: String,
    pub name: String,
}

impl std::fmt::Debug for ModelEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEndpoint")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

impl AppConfig {
    /// Load from the default path, `.env`, and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&Self::config_dir().join("config.toml"))
    }

    /// Like [`load`](Self::load) with an explicit config file.
    pub fn load_with(path: &Path) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(env_path) => tracing::debug!("Loaded environment from {}", env_path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Ignoring unreadable .env file: {e}"),
        }

        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path. No environment lookup.
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

    /// Apply environment overrides. `lookup` returns a variable's value;
    /// empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("BASE_URL") {
            self.model.base_url = Some(v);
        }
        if let Some(v) = get("MODEL_API_KEY") {
            self.model.api_key = Some(v);
        }
        if let Some(v) = get("MODEL_NAME") {
            self.model.name = Some(v);
        }

        if let Some(name) = get("BACKUP_MODEL") {
            let backup = self.model.backup.get_or_insert_with(|| BackupModelConfig {
                name: name.clone(),
                base_url: None,
                api_key: None,
            });
            backup.name = name;
        }
        if let Some(backup) = self.model.backup.as_mut() {
            if let Some(v) = get("BACKUP_BASE_URL") {
                backup.base_url = Some(v);
            }
            if let Some(v) = get("BACKUP_API_KEY") {
                backup.api_key = Some(v);
            }
        }

        if let Some(v) = get("EMBEDDING_MODEL") {
            self.retrieval.embedding_model = v;
        }
        if let Some(v) = get("EMBEDDING_API_BASE") {
            self.retrieval.embedding_base_url = Some(v);
        }
        if let Some(v) = get("EMBEDDING_API_KEY") {
            self.retrieval.embedding_api_key = Some(v);
        }
        if let Some(v) = get("DOCS_DIR") {
            self.retrieval.documents_dir = PathBuf::from(v);
            self.retrieval.enabled = true;
        }

        if let Some(v) = get("DEFAULT_WORD") {
            self.tutor.default_word = v;
        }
    }

    /// The chat model endpoint, or the first missing required variable.
    pub fn require_model(&self) -> Result<ModelEndpoint, ConfigError> {
        let base_url = self
            .model
            .base_url
            .clone()
            .ok_or(ConfigError::MissingVariable("BASE_URL"))?;
        let api_key = self
            .model
            .api_key
            .clone()
            .ok_or(ConfigError::MissingVariable("MODEL_API_KEY"))?;
        let name = self
            .model
            .name
            .clone()
            .ok_or(ConfigError::MissingVariable("MODEL_NAME"))?;
        Ok(ModelEndpoint { base_url, api_key, name })
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".wordtutor")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.model.max_tokens == 0 {
            return Err(ConfigError::ValidationError("model.max_tokens must be > 0".into()));
        }

        if self.tutor.default_word.trim().is_empty() {
            return Err(ConfigError::ValidationError("tutor.default_word must not be empty".into()));
        }

        if let Some(prompt) = &self.tutor.system_prompt {
            if !prompt.contains("{word}") {
                return Err(ConfigError::ValidationError(
                    "tutor.system_prompt must contain the {word} placeholder".into(),
                ));
            }
        }

        if self.tutor.max_tool_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "tutor.max_tool_iterations must be > 0".into(),
            ));
        }

        if self.retrieval.top_k == 0 || self.retrieval.top_k > self.retrieval.fetch_k {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be between 1 and retrieval.fetch_k".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
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

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("Missing required environment variable: {0}")]
    MissingVariable(&'static str),
}
