use crate::db::traits::{JobQueue, ResearchStore};
use crate::types::{
    ActivityLog, AppError, Document, NewResearchRequest, QueueStats, QueuedJob,
    RequestStatus, ResearchRequestRecord, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{params, Builder, Connection, Database, Row, Value};
use uuid::Uuid;

/// libsql-backed storage for the research pipeline.
///
/// Holds one connection for its whole lifetime: every `connect()` on an
/// in-memory database opens a fresh, empty database.
pub struct TursoClient {
    _db: Database,
    conn: Connection,
}

impl TursoClient {
    /// Ephemeral in-memory database
    pub async fn new_memory() -> Result<Self> {
        Self::new_local(":memory:").await
    }

    /// File-backed SQLite database, created if missing
    pub async fn new_local(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        AppError::Database(format!("Failed to create database directory: {}", e))
                    })?;
                }
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;

        Self::from_database(db).await
    }

    /// Remote Turso database
    #[cfg(feature = "turso")]
    pub async fn new_remote(url: String, auth_token: String) -> Result<Self> {
        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Turso: {}", e)))?;

        Self::from_database(db).await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Database(format!("Failed to get connection: {}", e)))?;

        let client = Self { _db: db, conn };
        client.initialize_schema().await?;

        Ok(client)
    }

    pub fn connection(&self) -> Connection {
        self.conn.clone()
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.connection();

        // Documents table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create documents table: {}", e)))?;

        // Live research requests
        conn.execute(
            "CREATE TABLE IF NOT EXISTS research_requests (
                id TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                document_ids TEXT NOT NULL,
                user_search_query TEXT NOT NULL,
                sequential_query INTEGER NOT NULL,
                status TEXT NOT NULL,
                individual_findings TEXT,
                overall_summary TEXT,
                error TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to create research_requests table: {}", e))
        })?;

        // Archived requests
        conn.execute(
            "CREATE TABLE IF NOT EXISTS activity_logs (
                id TEXT PRIMARY KEY,
                request_id TEXT NOT NULL,
                model TEXT NOT NULL,
                document_ids TEXT NOT NULL,
                user_search_query TEXT NOT NULL,
                sequential_query INTEGER NOT NULL,
                status TEXT NOT NULL,
                individual_findings TEXT NOT NULL,
                overall_summary TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create activity_logs table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activity_logs_request ON activity_logs(request_id)",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create activity log index: {}", e)))?;

        // API keys table
        conn.execute(
            "CREATE TABLE IF NOT EXISTS api_keys (
                key TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create api_keys table: {}", e)))?;

        // Durable job queue
        conn.execute(
            "CREATE TABLE IF NOT EXISTS research_jobs (
                id TEXT PRIMARY KEY,
                request_id TEXT NOT NULL,
                status TEXT NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create research_jobs table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_research_jobs_status ON research_jobs(status, created_at)",
            (),
        )
        .await
        .map_err(|e| AppError::Database(format!("Failed to create job index: {}", e)))?;

        Ok(())
    }
}

fn text(row: &Row, idx: i32) -> Result<String> {
    row.get::<String>(idx)
        .map_err(|e| AppError::Database(e.to_string()))
}

fn int(row: &Row, idx: i32) -> Result<i64> {
    row.get::<i64>(idx)
        .map_err(|e| AppError::Database(e.to_string()))
}

fn optional_text(row: &Row, idx: i32) -> Result<Option<String>> {
    match row
        .get_value(idx)
        .map_err(|e| AppError::Database(e.to_string()))?
    {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(AppError::Database(format!(
            "Expected text in column {}, got {:?}",
            idx, other
        ))),
    }
}

fn document_ids(row: &Row, idx: i32) -> Result<Vec<String>> {
    Ok(serde_json::from_str(&text(row, idx)?)?)
}

const REQUEST_COLUMNS: &str = "id, model, document_ids, user_search_query, sequential_query, \
     status, individual_findings, overall_summary, error, created_at, updated_at";

fn request_from_row(row: &Row) -> Result<ResearchRequestRecord> {
    Ok(ResearchRequestRecord {
        id: text(row, 0)?,
        provider: text(row, 1)?,
        document_ids: document_ids(row, 2)?,
        user_search_query: text(row, 3)?,
        sequential_query: int(row, 4)? != 0,
        status: text(row, 5)?,
        individual_findings: optional_text(row, 6)?,
        overall_summary: optional_text(row, 7)?,
        error: optional_text(row, 8)?,
        created_at: int(row, 9)?,
        updated_at: int(row, 10)?,
    })
}

const ACTIVITY_COLUMNS: &str = "id, request_id, model, document_ids, user_search_query, \
     sequential_query, status, individual_findings, overall_summary, created_at";

fn activity_log_from_row(row: &Row) -> Result<ActivityLog> {
    Ok(ActivityLog {
        id: text(row, 0)?,
        request_id: text(row, 1)?,
        provider: text(row, 2)?,
        document_ids: document_ids(row, 3)?,
        user_search_query: text(row, 4)?,
        sequential_query: int(row, 5)? != 0,
        status: text(row, 6)?,
        individual_findings: text(row, 7)?,
        overall_summary: text(row, 8)?,
        created_at: int(row, 9)?,
    })
}

#[async_trait]
impl ResearchStore for TursoClient {
    async fn create_document(
        &self,
        content: &str,
        metadata: &serde_json::Value,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO documents (id, content, metadata, created_at) VALUES (?, ?, ?, ?)",
                params![id.as_str(), content, serde_json::to_string(metadata)?, now],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create document: {}", e)))?;

        Ok(id)
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let mut rows = self
            .conn
            .query("SELECT id, content, metadata FROM documents WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query document: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(Document {
                id: text(&row, 0)?,
                content: text(&row, 1)?,
                metadata: serde_json::from_str(&text(&row, 2)?)?,
            })),
            None => Ok(None),
        }
    }

    async fn create_request(&self, request: &NewResearchRequest) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO research_requests
                 (id, model, document_ids, user_search_query, sequential_query, status, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id.as_str(),
                    request.provider.as_str(),
                    serde_json::to_string(&request.document_ids)?,
                    request.user_search_query.as_str(),
                    request.sequential_query as i64,
                    RequestStatus::InQueue.to_string(),
                    now,
                    now
                ],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create research request: {}", e)))?;

        Ok(id)
    }

    async fn get_request(&self, id: &str) -> Result<Option<ResearchRequestRecord>> {
        let sql = format!("SELECT {} FROM research_requests WHERE id = ?", REQUEST_COLUMNS);
        let mut rows = self
            .conn
            .query(&sql, [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query research request: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(request_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn claim_request(&self, id: &str, total: usize) -> Result<bool> {
        let status = RequestStatus::Researching { done: 0, total }.to_string();
        let now = Utc::now().timestamp();

        let changed = self
            .conn
            .execute(
                "UPDATE research_requests SET status = ?, updated_at = ?
                 WHERE id = ? AND status = ?",
                params![status, now, id, RequestStatus::InQueue.to_string()],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to claim research request: {}", e)))?;

        Ok(changed == 1)
    }

    async fn update_request_progress(
        &self,
        id: &str,
        status: &str,
        findings_json: &str,
    ) -> Result<()> {
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "UPDATE research_requests SET status = ?, individual_findings = ?, updated_at = ?
                 WHERE id = ?",
                params![status, findings_json, now, id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to update research progress: {}", e)))?;

        Ok(())
    }

    async fn complete_request(&self, id: &str, summary_json: &str) -> Result<()> {
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "UPDATE research_requests SET status = ?, overall_summary = ?, updated_at = ?
                 WHERE id = ?",
                params![RequestStatus::Completed.to_string(), summary_json, now, id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to complete research request: {}", e)))?;

        Ok(())
    }

    async fn mark_request_failed(&self, id: &str, error: &str) -> Result<()> {
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "UPDATE research_requests SET status = ?, error = ?, updated_at = ? WHERE id = ?",
                params![RequestStatus::Failed.to_string(), error, now, id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to mark request failed: {}", e)))?;

        Ok(())
    }

    async fn delete_request(&self, id: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM research_requests WHERE id = ?", [id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete research request: {}", e)))?;

        Ok(())
    }

    async fn create_activity_log(&self, log: &ActivityLog) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO activity_logs
                 (id, request_id, model, document_ids, user_search_query, sequential_query,
                  status, individual_findings, overall_summary, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    log.id.as_str(),
                    log.request_id.as_str(),
                    log.provider.as_str(),
                    serde_json::to_string(&log.document_ids)?,
                    log.user_search_query.as_str(),
                    log.sequential_query as i64,
                    log.status.as_str(),
                    log.individual_findings.as_str(),
                    log.overall_summary.as_str(),
                    log.created_at
                ],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create activity log: {}", e)))?;

        Ok(())
    }

    async fn get_activity_log_by_request(&self, request_id: &str) -> Result<Option<ActivityLog>> {
        let sql = format!(
            "SELECT {} FROM activity_logs WHERE request_id = ? ORDER BY created_at DESC LIMIT 1",
            ACTIVITY_COLUMNS
        );
        let mut rows = self
            .conn
            .query(&sql, [request_id])
            .await
            .map_err(|e| AppError::Database(format!("Failed to query activity log: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(activity_log_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_api_key(&self, key: &str) -> Result<()> {
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO api_keys (key, created_at) VALUES (?, ?)",
                params![key, now],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to create API key: {}", e)))?;

        Ok(())
    }

    async fn api_key_exists(&self, key: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM api_keys WHERE key = ?", [key])
            .await
            .map_err(|e| AppError::Database(format!("Failed to look up API key: {}", e)))?;

        Ok(rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .is_some())
    }
}

#[async_trait]
impl JobQueue for TursoClient {
    async fn enqueue(&self, request_id: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO research_jobs (id, request_id, status, attempts, created_at, updated_at)
                 VALUES (?, ?, 'pending', 0, ?, ?)",
                params![id.as_str(), request_id, now, now],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to enqueue job: {}", e)))?;

        Ok(id)
    }

    async fn claim_next_job(&self) -> Result<Option<QueuedJob>> {
        let now = Utc::now().timestamp();

        // Single statement so two pollers can never claim the same row
        let mut rows = self
            .conn
            .query(
                "UPDATE research_jobs
                 SET status = 'active', attempts = attempts + 1, updated_at = ?
                 WHERE id = (
                     SELECT id FROM research_jobs
                     WHERE status = 'pending'
                     ORDER BY created_at, rowid
                     LIMIT 1
                 ) AND status = 'pending'
                 RETURNING id, request_id, attempts",
                [now],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to claim job: {}", e)))?;

        match rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(QueuedJob {
                id: text(&row, 0)?,
                request_id: text(&row, 1)?,
                attempts: int(&row, 2)?,
            })),
            None => Ok(None),
        }
    }

    async fn finish_job(&self, job_id: &str, succeeded: bool) -> Result<()> {
        let now = Utc::now().timestamp();
        let status = if succeeded { "done" } else { "failed" };

        self.conn
            .execute(
                "UPDATE research_jobs SET status = ?, updated_at = ? WHERE id = ? AND status = 'active'",
                params![status, now, job_id],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to finish job: {}", e)))?;

        Ok(())
    }

    async fn recover_interrupted_jobs(&self) -> Result<u64> {
        let now = Utc::now().timestamp();

        // Requests that were still live when the process stopped
        self.conn
            .execute(
                "UPDATE research_requests
                 SET status = ?, error = ?, updated_at = ?
                 WHERE id IN (SELECT request_id FROM research_jobs WHERE status = 'active')",
                params![
                    RequestStatus::Failed.to_string(),
                    "Processing was interrupted by a worker shutdown",
                    now
                ],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to fail interrupted requests: {}", e)))?;

        let recovered = self
            .conn
            .execute(
                "UPDATE research_jobs SET status = 'failed', updated_at = ? WHERE status = 'active'",
                [now],
            )
            .await
            .map_err(|e| AppError::Database(format!("Failed to close interrupted jobs: {}", e)))?;

        Ok(recovered)
    }

    async fn queue_stats(&self) -> Result<QueueStats> {
        let mut rows = self
            .conn
            .query("SELECT status, COUNT(*) FROM research_jobs GROUP BY status", ())
            .await
            .map_err(|e| AppError::Database(format!("Failed to query queue stats: {}", e)))?;

        let mut stats = QueueStats::default();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
        {
            let count = int(&row, 1)? as u64;
            match text(&row, 0)?.as_str() {
                "pending" => stats.pending = count,
                "active" => stats.active = count,
                "done" => stats.done = count,
                "failed" => stats.failed = count,
                other => tracing::warn!(status = other, "Unknown job status in queue"),
            }
        }

        Ok(stats)
    }
}
