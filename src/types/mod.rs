use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============= API Request/Response Types =============

/// A document supplied inline with a research submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInput {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Body of `POST /api/research/enqueue`.
///
/// Every field is optional at the serde level so that validation can report
/// which one is missing instead of failing the whole body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResearchRequest {
    pub documents: Option<Vec<DocumentInput>>,
    pub user_search_query: Option<String>,
    pub sequential_query: Option<bool>,
    pub model: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResearchResponse {
    pub request_id: String,
}

// ============= Research Types =============

/// One chunk's provider response with its extracted title/page metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub title: String,
    pub page: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub summary: String,
}

/// A unit of document content handed to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// How the chunks of a single document are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Sequential,
    Parallel,
}

impl QueryMode {
    pub fn from_sequential(sequential: bool) -> Self {
        if sequential {
            QueryMode::Sequential
        } else {
            QueryMode::Parallel
        }
    }
}

/// Lifecycle of a research request as stored in its `status` column.
///
/// The string forms are part of the external contract:
/// `in queue`, `researching k/N`, `completed`, `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    InQueue,
    Researching { done: usize, total: usize },
    Completed,
    Failed,
}

impl RequestStatus {
    /// Whether the request has reached the end of its lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Failed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::InQueue => write!(f, "in queue"),
            RequestStatus::Researching { done, total } => write!(f, "researching {}/{}", done, total),
            RequestStatus::Completed => write!(f, "completed"),
            RequestStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in queue" => Ok(RequestStatus::InQueue),
            "completed" => Ok(RequestStatus::Completed),
            "failed" => Ok(RequestStatus::Failed),
            other => {
                let progress = other
                    .strip_prefix("researching ")
                    .and_then(|rest| rest.split_once('/'))
                    .and_then(|(done, total)| Some((done.parse::<usize>().ok()?, total.parse::<usize>().ok()?)));

                match progress {
                    Some((done, total)) if done <= total => {
                        Ok(RequestStatus::Researching { done, total })
                    }
                    _ => Err(AppError::Internal(format!("Unknown request status: {}", other))),
                }
            }
        }
    }
}

// ============= Storage Records =============

/// A stored source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub metadata: serde_json::Value,
}

/// Fields needed to create a live research request.
#[derive(Debug, Clone)]
pub struct NewResearchRequest {
    pub provider: String,
    pub document_ids: Vec<String>,
    pub user_search_query: String,
    pub sequential_query: bool,
}

/// The live working record of a research request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequestRecord {
    pub id: String,
    #[serde(rename = "model")]
    pub provider: String,
    pub document_ids: Vec<String>,
    pub user_search_query: String,
    pub sequential_query: bool,
    pub status: String,
    pub individual_findings: Option<String>,
    pub overall_summary: Option<String>,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ResearchRequestRecord {
    pub fn parsed_status(&self) -> Result<RequestStatus> {
        self.status.parse()
    }

    pub fn findings(&self) -> Result<Vec<Finding>> {
        match &self.individual_findings {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(Vec::new()),
        }
    }
}

/// Archival copy written once a request completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub request_id: String,
    #[serde(rename = "model")]
    pub provider: String,
    pub document_ids: Vec<String>,
    pub user_search_query: String,
    pub sequential_query: bool,
    pub status: String,
    pub individual_findings: String,
    pub overall_summary: String,
    pub created_at: i64,
}

impl ActivityLog {
    /// View an archived request in the shape of the live record
    pub fn into_request_record(self) -> ResearchRequestRecord {
        ResearchRequestRecord {
            id: self.request_id,
            provider: self.provider,
            document_ids: self.document_ids,
            user_search_query: self.user_search_query,
            sequential_query: self.sequential_query,
            status: self.status,
            individual_findings: Some(self.individual_findings),
            overall_summary: Some(self.overall_summary),
            error: None,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// A job claimed from the durable queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: String,
    pub request_id: String,
    pub attempts: i64,
}

/// Job counts per queue state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub active: u64,
    pub done: u64,
    pub failed: u64,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request with ID {0} not found")]
    RequestNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported AI model: {0}")]
    UnsupportedProvider(String),

    #[error("API key for model {provider} is not configured (set {env_var})")]
    MissingCredential { provider: String, env_var: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("Serialization failed: {}", err))
    }
}

impl From<libsql::Error> for AppError {
    fn from(err: libsql::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::LLM(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::RequestNotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_)
            | AppError::UnsupportedProvider(_)
            | AppError::MissingCredential { .. } => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match self {
            AppError::Auth(msg)
            | AppError::NotFound(msg)
            | AppError::InvalidInput(msg) => msg,
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
