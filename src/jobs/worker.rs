//! Worker pool that drains the research job queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::db::JobQueue;
use crate::jobs::handler::{JobOutcome, ResearchJobHandler};
use crate::types::{AppError, QueuedJob, Result};
use crate::utils::toml_config::WorkerSettings;

const EVENT_BUS_CAPACITY: usize = 256;

/// Configuration for the research worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds while the queue is empty.
    pub poll_interval_ms: u64,
    /// Maximum number of jobs processed at once.
    pub max_concurrent_jobs: usize,
    /// Whether to process jobs at all.
    pub enabled: bool,
    /// Fail jobs orphaned by a previous process before polling.
    pub recover_on_start: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from(&WorkerSettings::default())
    }
}

impl From<&WorkerSettings> for WorkerConfig {
    fn from(settings: &WorkerSettings) -> Self {
        Self {
            poll_interval_ms: settings.poll_interval_ms,
            max_concurrent_jobs: settings.max_concurrent_jobs.max(1),
            enabled: settings.enabled,
            recover_on_start: settings.recover_on_start,
        }
    }
}

impl WorkerConfig {
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max.max(1);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_recover_on_start(mut self, recover: bool) -> Self {
        self.recover_on_start = recover;
        self
    }
}

/// Event emitted by the research worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    WorkerStarted,
    JobStarted { job_id: String, request_id: String },
    JobCompleted { job_id: String, request_id: String },
    JobSkipped { job_id: String, request_id: String },
    JobFailed {
        job_id: String,
        request_id: String,
        error: String,
    },
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
    task: tokio::task::JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to stop claiming jobs and wait for in-flight jobs to drain.
    ///
    /// Dropping the handle without calling this also stops the worker.
    pub async fn shutdown(self) -> Result<()> {
        // A disabled worker has already exited and dropped its receiver
        if self.shutdown_tx.send(()).await.is_err() {
            debug!("Worker already stopped");
        }

        self.task
            .await
            .map_err(|e| AppError::Internal(format!("Worker task failed: {}", e)))
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Polls the queue and runs claimed jobs through the [`ResearchJobHandler`].
pub struct ResearchWorker {
    queue: Arc<dyn JobQueue>,
    handler: Arc<ResearchJobHandler>,
    config: WorkerConfig,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl ResearchWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        handler: Arc<ResearchJobHandler>,
        config: WorkerConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            queue,
            handler,
            config,
            event_tx,
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let task = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
            task,
        }
    }

    /// Run the polling loop.
    ///
    /// A semaphore caps in-flight jobs at `max_concurrent_jobs`; the loop only
    /// sleeps when the queue is empty.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Research worker is disabled, not starting");
            return;
        }

        // Every active job is assumed orphaned, so this must not run while
        // another instance is consuming the same queue
        if self.config.recover_on_start {
            match self.queue.recover_interrupted_jobs().await {
                Ok(0) => {}
                Ok(recovered) => warn!(recovered, "Failed jobs interrupted by a previous shutdown"),
                Err(e) => error!(error = %e, "Failed to recover interrupted jobs"),
            }
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_jobs,
            "Research worker started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_jobs));
        let mut tasks = JoinSet::new();

        loop {
            // Reap finished tasks so the set does not grow unbounded
            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    error!(error = ?e, "Job task panicked");
                }
            }

            let permit = tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Research worker received shutdown signal");
                    break;
                }
                permit = permits.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            match self.queue.claim_next_job().await {
                Ok(Some(job)) => {
                    let queue = self.queue.clone();
                    let handler = self.handler.clone();
                    let event_tx = self.event_tx.clone();

                    tasks.spawn(async move {
                        execute_job(queue, handler, event_tx, job).await;
                        drop(permit);
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!("Research worker received shutdown signal");
                            break;
                        }
                        _ = sleep(poll_interval) => {}
                    }
                }
                Err(e) => {
                    drop(permit);
                    error!(error = %e, "Failed to claim job");
                    sleep(poll_interval).await;
                }
            }
        }

        debug!(in_flight = tasks.len(), "Draining in-flight jobs");
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Job task panicked");
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Research worker stopped");
    }
}

/// Execute a single claimed job and close it in the queue.
async fn execute_job(
    queue: Arc<dyn JobQueue>,
    handler: Arc<ResearchJobHandler>,
    event_tx: broadcast::Sender<WorkerEvent>,
    job: QueuedJob,
) {
    let start = Instant::now();
    let job_id = job.id.clone();
    let request_id = job.request_id.clone();

    let _ = event_tx.send(WorkerEvent::JobStarted {
        job_id: job_id.clone(),
        request_id: request_id.clone(),
    });

    let outcome = handler.on_job(&request_id).await;

    if let Err(e) = queue.finish_job(&job_id, outcome.is_success()).await {
        error!(%job_id, error = %e, "Failed to close job");
    }

    let duration_ms = start.elapsed().as_millis() as u64;
    let event = match outcome {
        JobOutcome::Completed { .. } => {
            info!(%job_id, %request_id, duration_ms, "Job completed");
            WorkerEvent::JobCompleted { job_id, request_id }
        }
        JobOutcome::Skipped => {
            debug!(%job_id, %request_id, "Job skipped");
            WorkerEvent::JobSkipped { job_id, request_id }
        }
        JobOutcome::Failed(error) => {
            warn!(%job_id, %request_id, %error, duration_ms, "Job failed");
            WorkerEvent::JobFailed {
                job_id,
                request_id,
                error,
            }
        }
    };
    let _ = event_tx.send(event);
}
