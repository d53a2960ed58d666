mod common;

use aivo::{
    api::create_router,
    auth::generate_api_key,
    db::{JobQueue, TursoClient},
    llm::{ProviderId, ProviderRegistry},
    research::ResearchOrchestrator,
    types::QueueStats,
    utils::toml_config::{AivoConfig, ProviderConfig},
    AppState,
};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use common::mocks::{registry_with, EchoClient};
use rstest::rstest;
use serde_json::{json, Value};
use std::sync::Arc;

// ============= Test Setup =============

struct TestApp {
    server: TestServer,
    db: Arc<TursoClient>,
    registry: Arc<ProviderRegistry>,
    api_key: String,
}

impl TestApp {
    fn authed(&self, request: TestRequest) -> TestRequest {
        request.add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(&self.api_key).unwrap(),
        )
    }

    async fn submit(&self, body: Value) -> axum_test::TestResponse {
        self.authed(self.server.post("/api/research/enqueue"))
            .json(&body)
            .await
    }

    async fn status(&self, request_id: &str) -> axum_test::TestResponse {
        self.authed(
            self.server
                .get(&format!("/api/research/status/{}", request_id)),
        )
        .await
    }

    async fn count_rows(&self, table: &str) -> i64 {
        let mut rows = self
            .db
            .connection()
            .query(&format!("SELECT COUNT(*) FROM {}", table), ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().expect("count row");
        row.get::<i64>(0).unwrap()
    }

    /// A rejected submission must leave no documents, requests or jobs behind
    async fn assert_nothing_stored(&self) {
        assert_eq!(self.count_rows("documents").await, 0);
        assert_eq!(self.count_rows("research_requests").await, 0);
        assert_eq!(self.db.queue_stats().await.unwrap(), QueueStats::default());
    }
}

async fn create_test_app_with(registry: Arc<ProviderRegistry>) -> TestApp {
    let db = Arc::new(
        TursoClient::new_memory()
            .await
            .expect("Failed to create test database"),
    );
    let api_key = generate_api_key(db.as_ref()).await.unwrap();

    let state = AppState::new(Arc::new(AivoConfig::default()), db.clone(), registry.clone());
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");

    TestApp {
        server,
        db,
        registry,
        api_key,
    }
}

async fn create_test_app() -> TestApp {
    create_test_app_with(registry_with(ProviderId::OpenAI, Arc::new(EchoClient::new()))).await
}

fn valid_submission() -> Value {
    json!({
        "documents": [
            {"content": "The quarterly revenue grew by 12%.", "metadata": {"attributes": [{"key": "title", "value": "Q3 Report"}]}},
            {"content": "Headcount stayed flat."}
        ],
        "userSearchQuery": "How did the company perform?",
        "sequentialQuery": true,
        "model": "OpenAI"
    })
}

// ============= Health Check Tests =============

#[tokio::test]
async fn test_health_check_is_public() {
    let app = create_test_app().await;

    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["providers"], json!(["OpenAI"]));
}

// ============= Authentication Tests =============

#[tokio::test]
async fn test_missing_api_key_is_rejected() {
    let app = create_test_app().await;

    let response = app
        .server
        .post("/api/research/enqueue")
        .json(&valid_submission())
        .await;

    response.assert_status_unauthorized();
    response.assert_json(&json!({"error": "API Key is missing"}));
}

#[tokio::test]
async fn test_unknown_api_key_is_rejected() {
    let app = create_test_app().await;

    let response = app
        .server
        .get("/api/research/status/anything")
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static("not-a-real-key"),
        )
        .await;

    response.assert_status_unauthorized();
    response.assert_json(&json!({"error": "Invalid API Key"}));
}

#[tokio::test]
async fn test_empty_api_key_counts_as_missing() {
    let app = create_test_app().await;

    let response = app
        .server
        .get("/api/admin/queue")
        .add_header(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_static(""),
        )
        .await;

    response.assert_status_unauthorized();
    response.assert_json(&json!({"error": "API Key is missing"}));
}

// ============= Submission Tests =============

#[tokio::test]
async fn test_submit_returns_request_id_in_queue() {
    let app = create_test_app().await;

    let response = app.submit(valid_submission()).await;

    response.assert_status_ok();
    let body: Value = response.json();
    let request_id = body["requestId"].as_str().expect("requestId").to_string();

    let status = app.status(&request_id).await;
    status.assert_status_ok();
    let record: Value = status.json();
    assert_eq!(record["id"], request_id.as_str());
    assert_eq!(record["status"], "in queue");
    assert_eq!(record["model"], "OpenAI");
    assert_eq!(record["userSearchQuery"], "How did the company perform?");
    assert_eq!(record["sequentialQuery"], true);
    assert_eq!(record["documentIds"].as_array().unwrap().len(), 2);

    assert_eq!(app.count_rows("documents").await, 2);
    assert_eq!(app.count_rows("research_requests").await, 1);
    let stats = app.db.queue_stats().await.unwrap();
    assert_eq!(stats.pending, 1);
}

#[rstest]
#[case::no_documents(
    json!({"userSearchQuery": "q", "sequentialQuery": true, "model": "OpenAI"}),
    "Documents are required and should be a non-empty array"
)]
#[case::empty_documents(
    json!({"documents": [], "userSearchQuery": "q", "sequentialQuery": true, "model": "OpenAI"}),
    "Documents are required and should be a non-empty array"
)]
#[case::no_query(
    json!({"documents": [{"content": "x"}], "sequentialQuery": true, "model": "OpenAI"}),
    "User search query is required and should be a string"
)]
#[case::blank_query(
    json!({"documents": [{"content": "x"}], "userSearchQuery": "  ", "sequentialQuery": true, "model": "OpenAI"}),
    "User search query is required and should be a string"
)]
#[case::no_sequential_flag(
    json!({"documents": [{"content": "x"}], "userSearchQuery": "q", "model": "OpenAI"}),
    "Sequential query should be a boolean"
)]
#[case::no_model(
    json!({"documents": [{"content": "x"}], "userSearchQuery": "q", "sequentialQuery": false}),
    "Model is required and should be one of: AzureAI, OpenAI, AnthropicClaude, GoogleGemini, Mistral, Llama, Grok"
)]
#[case::unknown_model(
    json!({"documents": [{"content": "x"}], "userSearchQuery": "q", "sequentialQuery": false, "model": "GPT-5"}),
    "Model is required and should be one of: AzureAI, OpenAI, AnthropicClaude, GoogleGemini, Mistral, Llama, Grok"
)]
#[tokio::test]
async fn test_invalid_submissions_are_rejected(#[case] body: Value, #[case] message: &str) {
    let app = create_test_app().await;

    let response = app.submit(body).await;

    response.assert_status_bad_request();
    response.assert_json(&json!({"error": message}));
    app.assert_nothing_stored().await;
}

#[tokio::test]
async fn test_non_boolean_sequential_flag_is_rejected() {
    let app = create_test_app().await;

    let response = app
        .submit(json!({
            "documents": [{"content": "x"}],
            "userSearchQuery": "q",
            "sequentialQuery": "yes",
            "model": "OpenAI"
        }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = create_test_app().await;

    let response = app
        .authed(app.server.post("/api/research/enqueue"))
        .content_type("application/json")
        .text("{\"documents\": [")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_without_credentials_is_rejected() {
    let mut config = AivoConfig::default();
    config.providers.insert(
        "Mistral".to_string(),
        ProviderConfig {
            api_key_env: "AIVO_TEST_MISTRAL_KEY_NEVER_SET".to_string(),
            ..ProviderConfig::defaults_for(ProviderId::Mistral)
        },
    );
    let app = create_test_app_with(Arc::new(ProviderRegistry::from_config(&config))).await;

    let mut body = valid_submission();
    body["model"] = json!("Mistral");
    let response = app.submit(body).await;

    response.assert_status_bad_request();
    response.assert_json(&json!({"error": "API key for model Mistral is not configured"}));
    app.assert_nothing_stored().await;
}

// ============= Status Tests =============

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let app = create_test_app().await;

    let response = app.status("does-not-exist").await;

    response.assert_status_not_found();
    response.assert_json(&json!({"error": "Request not found"}));
}

#[tokio::test]
async fn test_completed_request_is_served_from_archive() {
    let app = create_test_app().await;
    let request_id = app.submit(valid_submission()).await.json::<Value>()["requestId"]
        .as_str()
        .unwrap()
        .to_string();

    ResearchOrchestrator::new(app.db.clone(), app.registry.clone())
        .process(&request_id)
        .await
        .unwrap();

    let response = app.status(&request_id).await;

    response.assert_status_ok();
    let record: Value = response.json();
    assert_eq!(record["id"], request_id.as_str());
    assert_eq!(record["status"], "completed");

    let findings: Vec<Value> =
        serde_json::from_str(record["individualFindings"].as_str().unwrap()).unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0]["title"], "Q3 Report");
    assert_eq!(findings[1]["title"], "Untitled Document");

    let summary: Value = serde_json::from_str(record["overallSummary"].as_str().unwrap()).unwrap();
    assert!(summary["summary"].is_string());
}

// ============= Queue Tests =============

#[tokio::test]
async fn test_queue_stats_endpoint() {
    let app = create_test_app().await;
    app.submit(valid_submission()).await.assert_status_ok();
    app.submit(valid_submission()).await.assert_status_ok();

    let response = app.authed(app.server.get("/api/admin/queue")).await;

    response.assert_status_ok();
    response.assert_json(&json!({"pending": 2, "active": 0, "done": 0, "failed": 0}));
}
