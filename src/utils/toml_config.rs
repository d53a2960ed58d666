//! TOML-based configuration for AIVO Brain
//!
//! This module provides declarative configuration for the server, the
//! database, the queue worker, the research pipeline and the LLM providers
//! via a TOML file (`aivo.toml`).
//!
//! Secrets are never written into the file. Providers name the environment
//! variable holding their API key and the key is resolved when the provider
//! registry is built.

use crate::llm::client::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from aivo.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AivoConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub worker: WorkerSettings,

    #[serde(default)]
    pub research: ResearchSettings,

    /// Provider overrides keyed by provider identifier (`OpenAI`, `AzureAI`, ...).
    /// Providers not listed here fall back to their built-in defaults.
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path, or `:memory:`
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Environment variable for Turso URL (optional cloud config)
    pub turso_url_env: Option<String>,

    /// Environment variable for Turso auth token
    pub turso_token_env: Option<String>,
}

fn default_database_url() -> String {
    "./data/aivo.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            turso_url_env: None,
            turso_token_env: None,
        }
    }
}

// ============= Worker Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of research jobs processed at once
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Sleep between polls while the queue is empty
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Fail jobs left `active` by a previous process when the worker starts.
    /// Only safe when a single instance consumes the queue; disable it when
    /// several servers share one database.
    #[serde(default = "default_true")]
    pub recover_on_start: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent_jobs() -> usize {
    4
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent_jobs: default_max_concurrent_jobs(),
            poll_interval_ms: default_poll_interval_ms(),
            recover_on_start: true,
        }
    }
}

// ============= Research Configuration =============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchSettings {
    /// What a failed chunk does to the rest of its document in parallel mode
    #[serde(default)]
    pub parallel_failure: ParallelFailurePolicy,
}

/// Failure policy for the parallel chunk fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParallelFailurePolicy {
    /// The first failing chunk discards every finding of the document.
    #[default]
    AbortDocument,
    /// Failing chunks become error findings, like sequential mode.
    IsolateChunk,
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable containing the API key
    pub api_key_env: String,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default)]
    pub api_base: Option<String>,

    /// Environment variable containing the base URL (takes precedence over `api_base`)
    #[serde(default)]
    pub api_base_env: Option<String>,

    /// Model (or Azure deployment) name
    #[serde(default)]
    pub model: Option<String>,

    /// Azure API version
    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-call timeout; no timeout when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_max_tokens() -> u32 {
    1024
}

impl ProviderConfig {
    /// Built-in settings for a provider that is not listed in the file
    pub fn defaults_for(provider: ProviderId) -> Self {
        let (api_key_env, api_base, api_base_env, model, api_version) = match provider {
            ProviderId::OpenAI => (
                "OPENAI_API_KEY",
                Some("https://api.openai.com/v1"),
                None,
                "gpt-4",
                None,
            ),
            ProviderId::AzureAI => (
                "AZURE_AAI_API_KEY",
                None,
                Some("AZURE_AISEARCH_ENDPOINT"),
                "gpt-4",
                Some("2024-10-21"),
            ),
            ProviderId::AnthropicClaude => (
                "ANTHROPIC_API_KEY",
                Some("https://api.anthropic.com/v1"),
                None,
                "claude-3-5-sonnet-latest",
                None,
            ),
            ProviderId::GoogleGemini => (
                "GOOGLE_GEMINI_API_KEY",
                Some("https://generativelanguage.googleapis.com/v1beta/openai"),
                None,
                "gemini-1.5-pro",
                None,
            ),
            ProviderId::Mistral => (
                "MISTRAL_API_KEY",
                Some("https://api.mistral.ai/v1"),
                None,
                "mistral-large-latest",
                None,
            ),
            ProviderId::Llama => (
                "LLAMA_API_KEY",
                Some("https://api.llama.com/compat/v1"),
                None,
                "Llama-3.3-70B-Instruct",
                None,
            ),
            ProviderId::Grok => (
                "GROK_API_KEY",
                Some("https://api.x.ai/v1"),
                None,
                "grok-2-latest",
                None,
            ),
        };

        Self {
            api_key_env: api_key_env.to_string(),
            api_base: api_base.map(str::to_string),
            api_base_env: api_base_env.map(str::to_string),
            model: Some(model.to_string()),
            api_version: api_version.map(str::to_string),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            timeout_secs: None,
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Unknown provider '{0}' in [providers]")]
    UnknownProvider(String),
}

impl AivoConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: AivoConfig = toml::from_str(&content)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration for internal consistency.
    ///
    /// Provider API keys are deliberately not checked here: a missing key only
    /// disables that provider, and submissions naming it are rejected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(ref env) = self.database.turso_url_env {
            self.validate_env_var(env)?;
        }
        if let Some(ref env) = self.database.turso_token_env {
            self.validate_env_var(env)?;
        }

        if self.worker.max_concurrent_jobs == 0 {
            return Err(ConfigError::ValidationError(
                "worker.max_concurrent_jobs must be at least 1".to_string(),
            ));
        }

        for (name, provider) in &self.providers {
            if name.parse::<ProviderId>().is_err() {
                return Err(ConfigError::UnknownProvider(name.clone()));
            }
            if provider.api_key_env.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "providers.{}.api_key_env must not be empty",
                    name
                )));
            }
            if provider.api_base.is_none() && provider.api_base_env.is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "providers.{} needs api_base or api_base_env",
                    name
                )));
            }
        }

        Ok(())
    }

    fn validate_env_var(&self, name: &str) -> Result<(), ConfigError> {
        self.resolve_env(name)
            .map(|_| ())
            .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
    }

    /// Resolve a non-empty environment variable
    pub fn resolve_env(&self, env_name: &str) -> Option<String> {
        std::env::var(env_name).ok().filter(|v| !v.is_empty())
    }

    /// Effective configuration for a provider, falling back to built-in defaults
    pub fn provider(&self, provider: ProviderId) -> ProviderConfig {
        self.providers
            .get(provider.as_str())
            .cloned()
            .unwrap_or_else(|| ProviderConfig::defaults_for(provider))
    }
}
