//! LLM client abstraction and provider identifiers
//!
//! Every research provider is reached through the [`LLMClient`] trait. The
//! rest of the pipeline never knows which backend answers a chunk; it only
//! asks the [`ProviderRegistry`](super::ProviderRegistry) for the client
//! registered under a [`ProviderId`].

use crate::types::{AppError, DocumentChunk, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generic LLM client trait for provider abstraction
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Answer a query against one document chunk.
    ///
    /// The default implementation sends the query followed by the chunk
    /// serialized as JSON.
    async fn invoke(&self, query: &str, chunk: &DocumentChunk) -> Result<ProviderResponse> {
        let prompt = format!("{}\n\nExcerpt: {}", query, serde_json::to_string(chunk)?);
        let content = self.generate(&prompt).await?;
        Ok(ProviderResponse { content })
    }

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from a provider for a single chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    /// The text content of the response
    pub content: String,
}

/// The fixed set of provider identifiers accepted in submissions.
///
/// The string form (`OpenAI`, `AzureAI`, ...) is what clients send in the
/// `model` field and what is persisted on the request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderId {
    OpenAI,
    AzureAI,
    AnthropicClaude,
    GoogleGemini,
    Mistral,
    Llama,
    Grok,
}

impl ProviderId {
    /// Every supported provider, in the order they are listed to users
    pub const ALL: [ProviderId; 7] = [
        ProviderId::AzureAI,
        ProviderId::OpenAI,
        ProviderId::AnthropicClaude,
        ProviderId::GoogleGemini,
        ProviderId::Mistral,
        ProviderId::Llama,
        ProviderId::Grok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAI => "OpenAI",
            ProviderId::AzureAI => "AzureAI",
            ProviderId::AnthropicClaude => "AnthropicClaude",
            ProviderId::GoogleGemini => "GoogleGemini",
            ProviderId::Mistral => "Mistral",
            ProviderId::Llama => "Llama",
            ProviderId::Grok => "Grok",
        }
    }

    /// Comma separated list used in validation messages
    pub fn supported_list() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        ProviderId::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| AppError::UnsupportedProvider(s.to_string()))
    }
}
