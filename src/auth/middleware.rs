use crate::types::{AppError, Result};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Header carrying the caller's API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without a known `x-api-key`.
///
/// Missing or unknown keys are 401s; a failed lookup is a 500.
pub async fn api_key_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response> {
    let api_key = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|k| !k.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| AppError::Auth("API Key is missing".to_string()))?;

    if !state.store.api_key_exists(&api_key).await? {
        tracing::debug!(path = %req.uri().path(), "Rejected unknown API key");
        return Err(AppError::Auth("Invalid API Key".to_string()));
    }

    Ok(next.run(req).await)
}
