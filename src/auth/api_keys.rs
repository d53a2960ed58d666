use crate::db::ResearchStore;
use crate::types::Result;
use uuid::Uuid;

/// Create and store a new random API key.
pub async fn generate_api_key(store: &dyn ResearchStore) -> Result<String> {
    let key = Uuid::new_v4().to_string();
    store.create_api_key(&key).await?;

    tracing::info!("Generated new API key");
    Ok(key)
}
