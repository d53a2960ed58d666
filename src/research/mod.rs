//! Multi-Document Research Pipeline
//!
//! This module holds the asynchronous research workflow: a request names a
//! set of documents, a query and a provider; each document is chunked, every
//! chunk is sent to the provider, and the resulting findings are summarized
//! and archived.
//!
//! # Architecture
//!
//! - [`submission::submit_research`] - Validates and persists a request, then enqueues it
//! - [`orchestrator::ResearchOrchestrator`] - Drives a request through its status lifecycle
//! - [`findings::aggregate_findings`] - Sequential or parallel chunk fan-out
//! - [`summary::generate_summary`] - Overall summary, never fails
//! - [`chunks::DocumentChunker`] - Document splitting seam
//!
//! # Usage
//!
//! ```ignore
//! use aivo::research::ResearchOrchestrator;
//!
//! let orchestrator = ResearchOrchestrator::new(store, registry);
//! match orchestrator.process(&request_id).await? {
//!     ProcessOutcome::Completed { findings, .. } => println!("{} findings", findings.len()),
//!     ProcessOutcome::AlreadyClaimed => {}
//! }
//! ```
//!
//! # Status Lifecycle
//!
//! 1. **in queue** - Written by submission
//! 2. **researching k/N** - After each of the N documents
//! 3. **completed** - Summary stored, then archived to the activity log
//! 4. **failed** - Set by the job handler when processing errors

/// Document chunking.
pub mod chunks;
/// Per-chunk provider calls and finding extraction.
pub mod findings;
/// Request state machine.
pub mod orchestrator;
/// Submission validation and persistence.
pub mod submission;
/// Overall summary generation.
pub mod summary;

pub use chunks::{DocumentChunker, WholeDocumentChunker};
pub use findings::aggregate_findings;
pub use orchestrator::{ProcessOutcome, ResearchOrchestrator};
pub use submission::submit_research;
pub use summary::generate_summary;
