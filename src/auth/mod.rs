//! API Key Authentication
//!
//! Every route under `/api` requires an `x-api-key` header naming a key stored
//! in the `api_keys` table.
//!
//! # Module Structure
//!
//! - [`auth::api_keys`](crate::auth::api_keys) - Key generation
//! - [`auth::middleware`](crate::auth::middleware) - Axum middleware enforcing the header
//!
//! # Usage
//!
//! Keys are issued from the command line:
//!
//! ```text
//! aivo-brain generate-api-key
//! ```
//!
//! and sent with each request:
//!
//! ```text
//! x-api-key: 1f0c6c1e-...
//! ```

/// API key generation.
pub mod api_keys;
/// `x-api-key` middleware for protected routes.
pub mod middleware;

pub use api_keys::generate_api_key;
pub use middleware::api_key_middleware;
