use crate::{
    research::submit_research,
    types::{
        AppError, QueueStats, ResearchRequestRecord, Result, SubmitResearchRequest,
        SubmitResearchResponse,
    },
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

/// Submit a research request for background processing
pub async fn enqueue_research(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitResearchRequest>, JsonRejection>,
) -> Result<Json<SubmitResearchResponse>> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Malformed research submission");
        AppError::InvalidInput(rejection.body_text())
    })?;

    let request_id = submit_research(
        state.store.as_ref(),
        state.queue.as_ref(),
        &state.providers,
        payload,
    )
    .await?;

    Ok(Json(SubmitResearchResponse { request_id }))
}

/// Get the status of a research request.
///
/// Completed requests are no longer live; they are answered from the
/// activity log.
pub async fn research_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResearchRequestRecord>> {
    if let Some(record) = state.store.get_request(&id).await? {
        return Ok(Json(record));
    }

    match state.store.get_activity_log_by_request(&id).await? {
        Some(log) => Ok(Json(log.into_request_record())),
        None => Err(AppError::NotFound("Request not found".to_string())),
    }
}

/// Job counts per queue state
pub async fn queue_stats(State(state): State<AppState>) -> Result<Json<QueueStats>> {
    Ok(Json(state.queue.queue_stats().await?))
}
