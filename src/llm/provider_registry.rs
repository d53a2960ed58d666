//! Provider Registry for the research providers
//!
//! Maps each [`ProviderId`] to the client that serves it. The registry is
//! built once at startup from [`AivoConfig`]: every provider whose secret is
//! available gets a client, every provider whose secret is missing is
//! remembered as such so that resolving it fails with
//! [`AppError::MissingCredential`] before any network call is attempted.
//!
//! New backends are added by [`ProviderRegistry::register`], never by
//! editing dispatch logic.

use crate::llm::client::{LLMClient, ProviderId};
use crate::llm::openai::{ChatCompletionsClient, ModelParams};
use crate::types::{AppError, Result};
use crate::utils::toml_config::{AivoConfig, ProviderConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

enum ProviderSlot {
    Ready(Arc<dyn LLMClient>),
    MissingCredential { env_var: String },
}

/// Registry of research providers keyed by identifier
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, ProviderSlot>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider registry from TOML configuration and the process environment
    pub fn from_config(config: &AivoConfig) -> Self {
        let mut registry = Self::new();

        for provider in ProviderId::ALL {
            let provider_config = config.provider(provider);
            match build_client(config, provider, &provider_config) {
                Ok(client) => {
                    tracing::info!(%provider, model = client.model_name(), "Registered provider");
                    registry.register(provider, client);
                }
                Err(env_var) => {
                    tracing::warn!(%provider, %env_var, "Provider disabled: credential not set");
                    registry
                        .providers
                        .insert(provider, ProviderSlot::MissingCredential { env_var });
                }
            }
        }

        registry
    }

    /// Register (or replace) the client serving a provider
    pub fn register(&mut self, provider: ProviderId, client: Arc<dyn LLMClient>) {
        self.providers.insert(provider, ProviderSlot::Ready(client));
    }

    /// Resolve a provider identifier to its client.
    ///
    /// # Errors
    ///
    /// - [`AppError::UnsupportedProvider`] for identifiers outside the fixed set,
    ///   or for known providers that were never registered
    /// - [`AppError::MissingCredential`] when the provider's secret is absent
    pub fn resolve(&self, provider: &str) -> Result<Arc<dyn LLMClient>> {
        let id: ProviderId = provider.parse()?;

        match self.providers.get(&id) {
            Some(ProviderSlot::Ready(client)) => Ok(client.clone()),
            Some(ProviderSlot::MissingCredential { env_var }) => {
                Err(AppError::MissingCredential {
                    provider: id.to_string(),
                    env_var: env_var.clone(),
                })
            }
            None => Err(AppError::UnsupportedProvider(id.to_string())),
        }
    }

    /// Providers that currently resolve to a client
    pub fn available(&self) -> Vec<ProviderId> {
        let mut ids: Vec<ProviderId> = self
            .providers
            .iter()
            .filter(|(_, slot)| matches!(slot, ProviderSlot::Ready(_)))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }
}

/// Build the client for one provider, or return the name of the missing env var
fn build_client(
    config: &AivoConfig,
    provider: ProviderId,
    provider_config: &ProviderConfig,
) -> std::result::Result<Arc<dyn LLMClient>, String> {
    let api_key = config
        .resolve_env(&provider_config.api_key_env)
        .ok_or_else(|| provider_config.api_key_env.clone())?;

    let api_base = match &provider_config.api_base_env {
        Some(env) => config.resolve_env(env).ok_or_else(|| env.clone())?,
        None => provider_config.api_base.clone().unwrap_or_default(),
    };

    let model = provider_config
        .model
        .clone()
        .or_else(|| ProviderConfig::defaults_for(provider).model)
        .unwrap_or_default();

    let params = ModelParams {
        temperature: provider_config.temperature,
        max_tokens: provider_config.max_tokens,
    };
    let timeout = provider_config.timeout_secs.map(Duration::from_secs);

    let client: Arc<dyn LLMClient> = match provider {
        ProviderId::AzureAI => {
            let api_version = provider_config
                .api_version
                .clone()
                .unwrap_or_else(|| "2024-10-21".to_string());
            Arc::new(
                ChatCompletionsClient::azure(api_key, api_base, model, api_version)
                    .with_params(params)
                    .with_timeout(timeout),
            )
        }
        _ => Arc::new(
            ChatCompletionsClient::openai_compatible(api_key, api_base, model)
                .with_params(params)
                .with_timeout(timeout),
        ),
    };

    Ok(client)
}
