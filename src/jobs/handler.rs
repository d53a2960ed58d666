//! Queue consumer for research jobs.

use crate::db::ResearchStore;
use crate::research::{ProcessOutcome, ResearchOrchestrator};
use std::sync::Arc;
use tracing::{error, info, warn};

/// What happened to a consumed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The request completed and was archived.
    Completed { findings: usize },
    /// Another execution owns the request.
    Skipped,
    /// Processing failed; the request was marked `failed` where possible.
    Failed(String),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, JobOutcome::Failed(_))
    }
}

/// Runs the orchestrator for one job and isolates its failures.
pub struct ResearchJobHandler {
    orchestrator: Arc<ResearchOrchestrator>,
    store: Arc<dyn ResearchStore>,
}

impl ResearchJobHandler {
    pub fn new(orchestrator: Arc<ResearchOrchestrator>, store: Arc<dyn ResearchStore>) -> Self {
        Self {
            orchestrator,
            store,
        }
    }

    /// Process the request carried by a job. Never re-enqueues.
    pub async fn on_job(&self, request_id: &str) -> JobOutcome {
        info!(%request_id, "Processing research job");

        match self.orchestrator.process(request_id).await {
            Ok(ProcessOutcome::Completed { findings, .. }) => {
                info!(%request_id, findings = findings.len(), "Research job completed");
                JobOutcome::Completed {
                    findings: findings.len(),
                }
            }
            Ok(ProcessOutcome::AlreadyClaimed) => {
                info!(%request_id, "Research job skipped, request already claimed");
                JobOutcome::Skipped
            }
            Err(e) => {
                let message = e.to_string();
                error!(%request_id, error = %message, "Research job failed");

                // Best effort: the record may be gone or storage may be down
                if let Err(mark_err) = self.store.mark_request_failed(request_id, &message).await {
                    warn!(%request_id, error = %mark_err, "Could not mark request as failed");
                }

                JobOutcome::Failed(message)
            }
        }
    }
}
