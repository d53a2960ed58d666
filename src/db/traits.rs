//! Storage abstraction traits
//!
//! This module provides the [`ResearchStore`] and [`JobQueue`] traits that the
//! research pipeline is written against, and [`DatabaseProvider`] for picking
//! a backend (in-memory SQLite, file-based SQLite, remote Turso).
//!
//! # Example
//!
//! ```rust,ignore
//! use aivo::db::DatabaseProvider;
//!
//! // Use in-memory database (default for tests)
//! let db = DatabaseProvider::Memory.create_client().await?;
//!
//! // Use file-based SQLite
//! let db = DatabaseProvider::SQLite { path: "data/aivo.db".into() }.create_client().await?;
//! ```

use crate::types::{
    ActivityLog, Document, NewResearchRequest, QueueStats, QueuedJob, ResearchRequestRecord,
    Result,
};
use crate::utils::toml_config::{AivoConfig, DatabaseConfig};
use async_trait::async_trait;

/// Database provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatabaseProvider {
    /// In-memory SQLite database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based SQLite database
    SQLite {
        /// Path to the SQLite database file
        path: String,
    },
    /// Remote Turso database (requires network access)
    #[cfg(feature = "turso")]
    Turso {
        /// The Turso database URL (e.g., `libsql://your-db.turso.io`)
        url: String,
        /// Authentication token for the Turso database
        auth_token: String,
    },
}

impl DatabaseProvider {
    /// Create a database client from this provider configuration
    pub async fn create_client(&self) -> Result<super::turso::TursoClient> {
        match self {
            DatabaseProvider::Memory => super::turso::TursoClient::new_memory().await,
            DatabaseProvider::SQLite { path } => super::turso::TursoClient::new_local(path).await,
            #[cfg(feature = "turso")]
            DatabaseProvider::Turso { url, auth_token } => {
                super::turso::TursoClient::new_remote(url.clone(), auth_token.clone()).await
            }
        }
    }

    /// Pick the backend described by the `[database]` section.
    ///
    /// Turso wins when both of its env vars resolve; otherwise `url` is used,
    /// with `:memory:` selecting the ephemeral database.
    pub fn from_config(config: &AivoConfig) -> Self {
        let db: &DatabaseConfig = &config.database;

        #[cfg(feature = "turso")]
        {
            let url = db.turso_url_env.as_deref().and_then(|e| config.resolve_env(e));
            let token = db.turso_token_env.as_deref().and_then(|e| config.resolve_env(e));
            if let (Some(url), Some(auth_token)) = (url, token) {
                return DatabaseProvider::Turso { url, auth_token };
            }
        }

        if db.url.is_empty() || db.url == ":memory:" {
            DatabaseProvider::Memory
        } else {
            DatabaseProvider::SQLite {
                path: db.url.clone(),
            }
        }
    }
}

/// Persistence for documents, research requests, activity logs and API keys.
///
/// The orchestrator only ever touches storage through this trait, so tests can
/// run the whole pipeline against an in-memory database.
#[async_trait]
pub trait ResearchStore: Send + Sync {
    // ============== Document Operations ==============

    /// Store a document, returning its generated id
    async fn create_document(&self, content: &str, metadata: &serde_json::Value)
        -> Result<String>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>>;

    // ============== Request Operations ==============

    /// Create a live request in `in queue`, returning its generated id
    async fn create_request(&self, request: &NewResearchRequest) -> Result<String>;

    async fn get_request(&self, id: &str) -> Result<Option<ResearchRequestRecord>>;

    /// Move a request from `in queue` to `researching 0/total`.
    ///
    /// Returns `false` when the request was not in `in queue`, i.e. another
    /// execution already owns it.
    async fn claim_request(&self, id: &str, total: usize) -> Result<bool>;

    /// Overwrite status and cumulative findings in one update
    async fn update_request_progress(&self, id: &str, status: &str, findings_json: &str)
        -> Result<()>;

    /// Set `completed` and the serialized summary
    async fn complete_request(&self, id: &str, summary_json: &str) -> Result<()>;

    /// Set `failed` and record the error text
    async fn mark_request_failed(&self, id: &str, error: &str) -> Result<()>;

    async fn delete_request(&self, id: &str) -> Result<()>;

    // ============== Activity Log Operations ==============

    /// Write the archival copy of a completed request
    async fn create_activity_log(&self, log: &ActivityLog) -> Result<()>;

    async fn get_activity_log_by_request(&self, request_id: &str) -> Result<Option<ActivityLog>>;

    // ============== API Key Operations ==============

    async fn create_api_key(&self, key: &str) -> Result<()>;

    async fn api_key_exists(&self, key: &str) -> Result<bool>;
}

/// Durable queue of research jobs.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job for a request, returning the job id
    async fn enqueue(&self, request_id: &str) -> Result<String>;

    /// Atomically move the oldest `pending` job to `active`
    async fn claim_next_job(&self) -> Result<Option<QueuedJob>>;

    /// Close an `active` job as `done` or `failed`
    async fn finish_job(&self, job_id: &str, succeeded: bool) -> Result<()>;

    /// Close jobs left `active` by a previous process and fail their requests.
    ///
    /// Every `active` job is treated as orphaned, so callers must be the only
    /// consumer of the queue. Returns the number of jobs recovered.
    async fn recover_interrupted_jobs(&self) -> Result<u64>;

    async fn queue_stats(&self) -> Result<QueueStats>;
}
