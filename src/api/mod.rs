//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Research (`/api/research`)
//! - `POST /api/research/enqueue` - Submit documents, query and model; returns `{requestId}`
//! - `GET /api/research/status/{id}` - Live request record, or its archived copy once completed
//!
//! ## Admin (`/api/admin`)
//! - `GET /api/admin/queue` - Job counts per queue state
//!
//! ## Health
//! - `GET /health` - Health check endpoint
//!
//! # Authentication
//!
//! Every `/api` endpoint requires a stored API key in the `x-api-key` header:
//! ```text
//! x-api-key: <key>
//! ```

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

pub use routes::create_router;
