//! # AIVO Brain - asynchronous multi-document research
//!
//! A research server built in Rust: clients submit documents, a natural
//! language query and an AI provider choice; a durable job queue hands the
//! request to a worker pool which runs every document through the provider
//! and accumulates the findings into an overall summary.
//!
//! ## Overview
//!
//! AIVO Brain can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `aivo-brain` binary
//! 2. **As a library** - Embed the pipeline in your own Rust project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use aivo::{db::TursoClient, research::ResearchOrchestrator, AivoConfig, ProviderRegistry};
//! use std::sync::Arc;
//!
//! let config = AivoConfig::load("aivo.toml")?;
//! let db = Arc::new(TursoClient::new_memory().await?);
//! let providers = Arc::new(ProviderRegistry::from_config(&config));
//!
//! let orchestrator = ResearchOrchestrator::new(db.clone(), providers);
//! orchestrator.process(&request_id).await?;
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `local-db` | Local SQLite database (default) |
//! | `turso` | Remote Turso database |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`auth`] - API key middleware and generation
//! - [`db`] - Storage and job queue (SQLite, Turso)
//! - [`jobs`] - Queue consumer and worker pool
//! - [`llm`] - Provider clients and registry
//! - [`research`] - Submission, orchestration, findings and summary
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// API key authentication.
pub mod auth;
/// Command-line interface.
pub mod cli;
/// Database clients (Turso/SQLite).
pub mod db;
/// Background job processing.
pub mod jobs;
/// LLM provider clients and abstractions.
pub mod llm;
/// The research pipeline.
pub mod research;
/// Core types (requests, records, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

use std::sync::Arc;

// Re-export commonly used types
pub use db::{JobQueue, ResearchStore, TursoClient};
pub use llm::{LLMClient, ProviderId, ProviderRegistry};
pub use types::{AppError, Result};
pub use utils::toml_config::AivoConfig;

/// Shared state handed to every HTTP handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AivoConfig>,
    pub store: Arc<dyn ResearchStore>,
    pub queue: Arc<dyn JobQueue>,
    pub providers: Arc<ProviderRegistry>,
}

impl AppState {
    /// State backed by a single libsql client for both storage and queue
    pub fn new(
        config: Arc<AivoConfig>,
        db: Arc<TursoClient>,
        providers: Arc<ProviderRegistry>,
    ) -> Self {
        Self {
            config,
            store: db.clone(),
            queue: db,
            providers,
        }
    }

    /// Build the research worker for this state
    pub fn research_worker(&self) -> jobs::ResearchWorker {
        let orchestrator = Arc::new(
            research::ResearchOrchestrator::new(self.store.clone(), self.providers.clone())
                .with_parallel_failure(self.config.research.parallel_failure),
        );
        let handler = Arc::new(jobs::ResearchJobHandler::new(
            orchestrator,
            self.store.clone(),
        ));

        jobs::ResearchWorker::new(
            self.queue.clone(),
            handler,
            jobs::WorkerConfig::from(&self.config.worker),
        )
    }
}
