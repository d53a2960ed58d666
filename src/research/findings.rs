//! Per-document finding aggregation
//!
//! Sends every chunk of a document to the provider and turns each response
//! into a [`Finding`]. Sequential mode walks the chunks in order and records
//! failures as error findings. Parallel mode fans out with a [`JoinSet`] and
//! reassembles the results in input order; what a failed chunk does to its
//! siblings is decided by [`ParallelFailurePolicy`].

use crate::llm::LLMClient;
use crate::types::{DocumentChunk, Finding, QueryMode};
use crate::utils::toml_config::ParallelFailurePolicy;
use std::sync::Arc;
use tokio::task::JoinSet;

pub const DEFAULT_TITLE: &str = "Untitled Document";
pub const DEFAULT_PAGE: &str = "N/A";

/// Query every chunk and collect the findings.
///
/// Never fails: chunk errors become error findings, or an empty list for the
/// document under [`ParallelFailurePolicy::AbortDocument`].
pub async fn aggregate_findings(
    chunks: Vec<DocumentChunk>,
    query: &str,
    mode: QueryMode,
    client: Arc<dyn LLMClient>,
    policy: ParallelFailurePolicy,
) -> Vec<Finding> {
    match mode {
        QueryMode::Sequential => sequential_findings(chunks, query, client.as_ref()).await,
        QueryMode::Parallel => parallel_findings(chunks, query, client, policy).await,
    }
}

async fn sequential_findings(
    chunks: Vec<DocumentChunk>,
    query: &str,
    client: &dyn LLMClient,
) -> Vec<Finding> {
    let mut findings = Vec::with_capacity(chunks.len());

    for (index, chunk) in chunks.iter().enumerate() {
        let content = match client.invoke(query, chunk).await {
            Ok(response) => response.content,
            Err(e) => {
                tracing::warn!(chunk = index, error = %e, "Chunk failed");
                error_content(e)
            }
        };
        findings.push(finding_for(chunk, content));
    }

    findings
}

async fn parallel_findings(
    chunks: Vec<DocumentChunk>,
    query: &str,
    client: Arc<dyn LLMClient>,
    policy: ParallelFailurePolicy,
) -> Vec<Finding> {
    let mut set = JoinSet::new();

    for (index, chunk) in chunks.iter().enumerate() {
        let client = client.clone();
        let query = query.to_string();
        let chunk = chunk.clone();

        set.spawn(async move { (index, client.invoke(&query, &chunk).await) });
    }

    let mut contents: Vec<Option<String>> = vec![None; chunks.len()];

    while let Some(joined) = set.join_next().await {
        let (index, outcome) = match joined {
            Ok((index, result)) => (index, result.map(|r| r.content).map_err(|e| e.to_string())),
            Err(e) => {
                // A panicked task has no index; treat it as fatal for the document
                tracing::error!(error = %e, "Chunk task failed to complete");
                set.abort_all();
                return Vec::new();
            }
        };

        match outcome {
            Ok(content) => contents[index] = Some(content),
            Err(e) => match policy {
                ParallelFailurePolicy::AbortDocument => {
                    tracing::error!(chunk = index, error = %e, "Chunk failed, discarding document findings");
                    set.abort_all();
                    return Vec::new();
                }
                ParallelFailurePolicy::IsolateChunk => {
                    tracing::warn!(chunk = index, error = %e, "Chunk failed");
                    contents[index] = Some(error_content(e));
                }
            },
        }
    }

    chunks
        .iter()
        .zip(contents)
        .map(|(chunk, content)| finding_for(chunk, content.unwrap_or_default()))
        .collect()
}

fn error_content(err: impl std::fmt::Display) -> String {
    format!("Error processing chunk: {}", err)
}

fn finding_for(chunk: &DocumentChunk, content: String) -> Finding {
    Finding {
        title: attribute(&chunk.metadata, "title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        page: attribute(&chunk.metadata, "pageNumber").unwrap_or_else(|| DEFAULT_PAGE.to_string()),
        content,
    }
}

/// Look up `key` in `metadata.attributes`, a list of `{key, value}` objects.
///
/// String values are returned as-is, anything else as its JSON text. Empty
/// strings count as absent.
pub fn attribute(metadata: &serde_json::Value, key: &str) -> Option<String> {
    metadata
        .get("attributes")?
        .as_array()?
        .iter()
        .find(|attr| attr.get("key").and_then(|k| k.as_str()) == Some(key))
        .and_then(|attr| attr.get("value"))
        .filter(|value| !value.is_null())
        .map(|value| match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        })
        .filter(|s| !s.is_empty())
}
