//! Mock implementations for testing.
//!
//! This module provides mock LLM clients, a chunker and a recording store
//! that can be used across different test files without duplication.

use aivo::db::{ResearchStore, TursoClient};
use aivo::llm::{LLMClient, ProviderId, ProviderRegistry, ProviderResponse};
use aivo::research::DocumentChunker;
use aivo::types::{
    ActivityLog, AppError, Document, DocumentChunk, NewResearchRequest, ResearchRequestRecord,
    Result,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Answers each chunk with the query followed by the chunk content.
#[derive(Default)]
pub struct EchoClient {
    calls: AtomicUsize,
}

impl EchoClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LLMClient for EchoClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        Ok(format!("Summary: {}", prompt.len()))
    }

    async fn invoke(&self, query: &str, chunk: &DocumentChunk) -> Result<ProviderResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderResponse {
            content: format!("{}{}", query, chunk.content),
        })
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

/// Fails every call.
pub struct FailingClient;

#[async_trait]
impl LLMClient for FailingClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(AppError::LLM("Mock LLM failure".to_string()))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Fails chunks whose content contains `FAIL`, echoes the rest.
pub struct SelectiveFailClient;

#[async_trait]
impl LLMClient for SelectiveFailClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok("summary".to_string())
    }

    async fn invoke(&self, _query: &str, chunk: &DocumentChunk) -> Result<ProviderResponse> {
        if chunk.content.contains("FAIL") {
            return Err(AppError::LLM(format!("cannot read {}", chunk.content)));
        }
        Ok(ProviderResponse {
            content: chunk.content.clone(),
        })
    }

    fn model_name(&self) -> &str {
        "selective"
    }
}

/// Chunk content of the form `"{delay_ms}|{answer}"`: sleeps, then answers.
pub struct DelayedClient;

#[async_trait]
impl LLMClient for DelayedClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok("summary".to_string())
    }

    async fn invoke(&self, _query: &str, chunk: &DocumentChunk) -> Result<ProviderResponse> {
        let (delay, answer) = chunk
            .content
            .split_once('|')
            .ok_or_else(|| AppError::LLM("bad chunk".to_string()))?;
        let delay: u64 = delay
            .parse()
            .map_err(|_| AppError::LLM("bad delay".to_string()))?;

        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(ProviderResponse {
            content: answer.to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "delayed"
    }
}

/// Chunk calls succeed, summary calls fail.
pub struct SummaryFailingClient;

#[async_trait]
impl LLMClient for SummaryFailingClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(AppError::LLM("summary backend down".to_string()))
    }

    async fn invoke(&self, _query: &str, chunk: &DocumentChunk) -> Result<ProviderResponse> {
        Ok(ProviderResponse {
            content: chunk.content.clone(),
        })
    }

    fn model_name(&self) -> &str {
        "summary-failing"
    }
}

/// One chunk per line; `pageNumber` is the 1-based line number.
pub struct LineChunker;

impl DocumentChunker for LineChunker {
    fn chunk(&self, document: &Document) -> Vec<DocumentChunk> {
        document
            .content
            .lines()
            .enumerate()
            .map(|(i, line)| DocumentChunk {
                content: line.to_string(),
                metadata: json!({
                    "attributes": [
                        {"key": "title", "value": document.id},
                        {"key": "pageNumber", "value": (i + 1).to_string()}
                    ]
                }),
            })
            .collect()
    }
}

/// Registry with a single provider registered
pub fn registry_with(provider: ProviderId, client: Arc<dyn LLMClient>) -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    registry.register(provider, client);
    Arc::new(registry)
}

/// Store wrapper that records every progress write.
pub struct RecordingStore {
    inner: Arc<TursoClient>,
    progress: Mutex<Vec<(String, usize)>>,
}

impl RecordingStore {
    pub fn new(inner: Arc<TursoClient>) -> Self {
        Self {
            inner,
            progress: Mutex::new(Vec::new()),
        }
    }

    /// `(status, number of findings)` for each progress write, in order
    pub fn progress(&self) -> Vec<(String, usize)> {
        self.progress.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResearchStore for RecordingStore {
    async fn create_document(
        &self,
        content: &str,
        metadata: &serde_json::Value,
    ) -> Result<String> {
        self.inner.create_document(content, metadata).await
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        self.inner.get_document(id).await
    }

    async fn create_request(&self, request: &NewResearchRequest) -> Result<String> {
        self.inner.create_request(request).await
    }

    async fn get_request(&self, id: &str) -> Result<Option<ResearchRequestRecord>> {
        self.inner.get_request(id).await
    }

    async fn claim_request(&self, id: &str, total: usize) -> Result<bool> {
        self.inner.claim_request(id, total).await
    }

    async fn update_request_progress(
        &self,
        id: &str,
        status: &str,
        findings_json: &str,
    ) -> Result<()> {
        let findings: Vec<serde_json::Value> = serde_json::from_str(findings_json)?;
        self.progress
            .lock()
            .unwrap()
            .push((status.to_string(), findings.len()));
        self.inner
            .update_request_progress(id, status, findings_json)
            .await
    }

    async fn complete_request(&self, id: &str, summary_json: &str) -> Result<()> {
        self.inner.complete_request(id, summary_json).await
    }

    async fn mark_request_failed(&self, id: &str, error: &str) -> Result<()> {
        self.inner.mark_request_failed(id, error).await
    }

    async fn delete_request(&self, id: &str) -> Result<()> {
        self.inner.delete_request(id).await
    }

    async fn create_activity_log(&self, log: &ActivityLog) -> Result<()> {
        self.inner.create_activity_log(log).await
    }

    async fn get_activity_log_by_request(&self, request_id: &str) -> Result<Option<ActivityLog>> {
        self.inner.get_activity_log_by_request(request_id).await
    }

    async fn create_api_key(&self, key: &str) -> Result<()> {
        self.inner.create_api_key(key).await
    }

    async fn api_key_exists(&self, key: &str) -> Result<bool> {
        self.inner.api_key_exists(key).await
    }
}

/// Store documents and a queued request naming them
pub async fn seed_request(
    db: &TursoClient,
    provider: ProviderId,
    documents: &[&str],
    sequential: bool,
) -> String {
    let mut document_ids = Vec::new();
    for content in documents {
        document_ids.push(db.create_document(content, &json!({})).await.unwrap());
    }

    db.create_request(&NewResearchRequest {
        provider: provider.to_string(),
        document_ids,
        user_search_query: "What does the document say?".to_string(),
        sequential_query: sequential,
    })
    .await
    .unwrap()
}
