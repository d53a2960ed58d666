//! Background processing of queued research requests.
//!
//! - [`handler::ResearchJobHandler`] - consumes one job, marks failures
//! - [`worker::ResearchWorker`] - bounded pool polling the durable queue

pub mod handler;
pub mod worker;

pub use handler::{JobOutcome, ResearchJobHandler};
pub use worker::{ResearchWorker, WorkerConfig, WorkerEvent, WorkerHandle};
