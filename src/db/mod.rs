//! Database clients.
//!
//! - **Turso/SQLite** via libsql: documents, research requests, activity logs,
//!   API keys and the durable job queue.
//!
//! Enable remote Turso via the `turso` Cargo feature.

pub mod traits;
pub mod turso;

pub use traits::{DatabaseProvider, JobQueue, ResearchStore};
pub use turso::TursoClient;
