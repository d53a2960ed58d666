//! Request orchestration
//!
//! [`ResearchOrchestrator::process`] drives one research request through its
//! lifecycle:
//!
//! ```text
//! in queue -> researching 0/N -> researching 1/N -> ... -> researching N/N -> completed
//!                                                                        \-> (archived, deleted)
//! ```
//!
//! The first transition is a conditional claim on the stored status, so a job
//! delivered twice is processed once. Progress and the cumulative findings are
//! written together after every document.

use crate::db::ResearchStore;
use crate::llm::ProviderRegistry;
use crate::research::chunks::{DocumentChunker, WholeDocumentChunker};
use crate::research::findings::aggregate_findings;
use crate::research::summary::generate_summary;
use crate::types::{
    ActivityLog, AppError, Finding, QueryMode, RequestStatus, Result, Summary,
};
use crate::utils::toml_config::ParallelFailurePolicy;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Result of a [`ResearchOrchestrator::process`] call
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// The request ran to completion and was archived
    Completed {
        findings: Vec<Finding>,
        summary: Summary,
        activity_log_id: String,
    },
    /// Another execution already owns the request; nothing was touched
    AlreadyClaimed,
}

pub struct ResearchOrchestrator {
    store: Arc<dyn ResearchStore>,
    registry: Arc<ProviderRegistry>,
    chunker: Arc<dyn DocumentChunker>,
    parallel_failure: ParallelFailurePolicy,
}

impl ResearchOrchestrator {
    pub fn new(store: Arc<dyn ResearchStore>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            store,
            registry,
            chunker: Arc::new(WholeDocumentChunker),
            parallel_failure: ParallelFailurePolicy::default(),
        }
    }

    pub fn with_chunker(mut self, chunker: Arc<dyn DocumentChunker>) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn with_parallel_failure(mut self, policy: ParallelFailurePolicy) -> Self {
        self.parallel_failure = policy;
        self
    }

    /// Process a queued research request end to end.
    ///
    /// # Errors
    ///
    /// - [`AppError::RequestNotFound`] if no live record exists
    /// - provider resolution errors, storage errors
    ///
    /// Missing documents, chunk failures and summary failures are not errors.
    pub async fn process(&self, request_id: &str) -> Result<ProcessOutcome> {
        let request = self
            .store
            .get_request(request_id)
            .await?
            .ok_or_else(|| AppError::RequestNotFound(request_id.to_string()))?;

        let total = request.document_ids.len();

        if !self.store.claim_request(request_id, total).await? {
            tracing::warn!(%request_id, status = %request.status, "Request already claimed, skipping");
            return Ok(ProcessOutcome::AlreadyClaimed);
        }

        let client = self.registry.resolve(&request.provider)?;
        let mode = QueryMode::from_sequential(request.sequential_query);

        tracing::info!(
            %request_id,
            provider = %request.provider,
            documents = total,
            ?mode,
            "Research started"
        );

        let mut findings: Vec<Finding> = Vec::new();

        for (index, document_id) in request.document_ids.iter().enumerate() {
            match self.store.get_document(document_id).await? {
                Some(document) => {
                    let chunks = self.chunker.chunk(&document);
                    let document_findings = aggregate_findings(
                        chunks,
                        &request.user_search_query,
                        mode,
                        client.clone(),
                        self.parallel_failure,
                    )
                    .await;

                    tracing::debug!(
                        %request_id,
                        %document_id,
                        findings = document_findings.len(),
                        "Document processed"
                    );
                    findings.extend(document_findings);
                }
                None => {
                    tracing::warn!(%request_id, %document_id, "Document not found, skipping");
                }
            }

            let status = RequestStatus::Researching {
                done: index + 1,
                total,
            };
            self.store
                .update_request_progress(
                    request_id,
                    &status.to_string(),
                    &serde_json::to_string(&findings)?,
                )
                .await?;
        }

        let summary = generate_summary(&findings, &request.provider, &self.registry).await;
        let summary_json = serde_json::to_string(&summary)?;

        self.store.complete_request(request_id, &summary_json).await?;

        let activity_log = ActivityLog {
            id: Uuid::new_v4().to_string(),
            request_id: request_id.to_string(),
            provider: request.provider.clone(),
            document_ids: request.document_ids.clone(),
            user_search_query: request.user_search_query.clone(),
            sequential_query: request.sequential_query,
            status: RequestStatus::Completed.to_string(),
            individual_findings: serde_json::to_string(&findings)?,
            overall_summary: summary_json,
            created_at: Utc::now().timestamp(),
        };
        self.store.create_activity_log(&activity_log).await?;

        self.store.delete_request(request_id).await?;

        tracing::info!(
            %request_id,
            findings = findings.len(),
            activity_log_id = %activity_log.id,
            "Research completed"
        );

        Ok(ProcessOutcome::Completed {
            findings,
            summary,
            activity_log_id: activity_log.id,
        })
    }
}
