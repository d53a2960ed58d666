use crate::db::{JobQueue, ResearchStore};
use crate::llm::{ProviderId, ProviderRegistry};
use crate::types::{AppError, NewResearchRequest, Result, SubmitResearchRequest};

/// Validate a submission, persist its documents and request, and enqueue it.
///
/// Validation (including provider resolution) happens before anything is
/// written, so a rejected submission leaves no records behind.
pub async fn submit_research(
    store: &dyn ResearchStore,
    queue: &dyn JobQueue,
    registry: &ProviderRegistry,
    payload: SubmitResearchRequest,
) -> Result<String> {
    let documents = match payload.documents {
        Some(documents) if !documents.is_empty() => documents,
        _ => {
            return Err(AppError::InvalidInput(
                "Documents are required and should be a non-empty array".to_string(),
            ))
        }
    };

    let user_search_query = match payload.user_search_query {
        Some(query) if !query.trim().is_empty() => query,
        _ => {
            return Err(AppError::InvalidInput(
                "User search query is required and should be a string".to_string(),
            ))
        }
    };

    let sequential_query = payload.sequential_query.ok_or_else(|| {
        AppError::InvalidInput("Sequential query should be a boolean".to_string())
    })?;

    let model = payload.model.unwrap_or_default();
    match registry.resolve(&model) {
        Ok(_) => {}
        Err(AppError::UnsupportedProvider(_)) => {
            return Err(AppError::InvalidInput(format!(
                "Model is required and should be one of: {}",
                ProviderId::supported_list()
            )))
        }
        Err(AppError::MissingCredential { provider, env_var }) => {
            tracing::warn!(%provider, %env_var, "Submission names a provider without credentials");
            return Err(AppError::InvalidInput(format!(
                "API key for model {} is not configured",
                provider
            )));
        }
        Err(other) => return Err(other),
    }

    let mut document_ids = Vec::with_capacity(documents.len());
    for document in &documents {
        let metadata = if document.metadata.is_null() {
            serde_json::json!({})
        } else {
            document.metadata.clone()
        };
        document_ids.push(store.create_document(&document.content, &metadata).await?);
    }

    let request_id = store
        .create_request(&NewResearchRequest {
            provider: model.clone(),
            document_ids,
            user_search_query,
            sequential_query,
        })
        .await?;

    let job_id = queue.enqueue(&request_id).await?;

    tracing::info!(%request_id, %job_id, provider = %model, documents = documents.len(), "Research request enqueued");

    Ok(request_id)
}
