//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for the AI providers a research
//! request can name. Provider-specific details stay behind common traits, so
//! the research pipeline works with any supported backend.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`ProviderId`] - The fixed set of provider identifiers
//! - [`ProviderRegistry`] - Registered-capability map built from `aivo.toml`
//! - [`openai::ChatCompletionsClient`] - OpenAI-compatible client used by every provider
//!
//! # Example
//!
//! ```ignore
//! use aivo::llm::ProviderRegistry;
//!
//! let registry = ProviderRegistry::from_config(&config);
//! let client = registry.resolve("OpenAI")?;
//!
//! let answer = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider identifiers.
pub mod client;
/// OpenAI-compatible chat-completions client.
pub mod openai;
/// Registry mapping provider identifiers to clients.
pub mod provider_registry;

pub use client::{LLMClient, ProviderId, ProviderResponse};
pub use provider_registry::ProviderRegistry;
