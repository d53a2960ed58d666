//! OpenAI-compatible chat-completions client
//!
//! All seven research providers expose an OpenAI-compatible
//! `/chat/completions` endpoint (Azure through its deployment-scoped URL), so a
//! single client generic over the `async-openai` [`Config`] covers them all.

use crate::llm::client::LLMClient;
use crate::types::{AppError, Result};
use async_openai::{
    config::{AzureConfig, Config, OpenAIConfig},
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;

/// Sampling parameters sent with every request
#[derive(Debug, Clone, Copy)]
pub struct ModelParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

pub struct ChatCompletionsClient<C: Config> {
    client: Client<C>,
    model: String,
    params: ModelParams,
    timeout: Option<Duration>,
}

impl ChatCompletionsClient<OpenAIConfig> {
    /// Client for OpenAI itself or any endpoint speaking its dialect
    pub fn openai_compatible(api_key: String, api_base: String, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);

        Self::with_config(config, model)
    }
}

impl ChatCompletionsClient<AzureConfig> {
    /// Client for an Azure OpenAI deployment
    pub fn azure(api_key: String, endpoint: String, deployment: String, api_version: String) -> Self {
        let config = AzureConfig::new()
            .with_api_base(endpoint)
            .with_api_key(api_key)
            .with_deployment_id(deployment.clone())
            .with_api_version(api_version);

        Self::with_config(config, deployment)
    }
}

impl<C: Config> ChatCompletionsClient<C> {
    pub fn with_config(config: C, model: String) -> Self {
        Self {
            client: Client::with_config(config),
            model,
            params: ModelParams::default(),
            timeout: None,
        }
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    /// Fail a call that takes longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build request: {}", e)))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .temperature(self.params.temperature)
            .max_tokens(self.params.max_tokens)
            .build()
            .map_err(|e| AppError::LLM(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::LLM(format!("API error from {}: {}", self.model, e)))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::LLM(format!("No response content from {}", self.model)))
    }
}

#[async_trait]
impl<C: Config> LLMClient for ChatCompletionsClient<C> {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Calling chat completions");

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.complete(prompt))
                .await
                .map_err(|_| {
                    AppError::LLM(format!(
                        "Call to {} timed out after {:?}",
                        self.model, limit
                    ))
                })?,
            None => self.complete(prompt).await,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentChunk;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "gpt-4",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop",
                "logprobs": null
            }],
            "usage": { "prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7 }
        })
    }

    fn client_for(server: &MockServer) -> ChatCompletionsClient<OpenAIConfig> {
        ChatCompletionsClient::openai_compatible(
            "sk-test".to_string(),
            format!("{}/v1", server.uri()),
            "gpt-4".to_string(),
        )
    }

    #[tokio::test]
    async fn test_generate_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Paris")))
            .expect(1)
            .mount(&server)
            .await;

        let answer = client_for(&server).generate("Capital of France?").await.unwrap();
        assert_eq!(answer, "Paris");
    }

    #[tokio::test]
    async fn test_invoke_sends_query_and_excerpt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_string_contains("Who wrote it?"))
            .and(body_string_contains("Excerpt:"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Tolstoy")))
            .mount(&server)
            .await;

        let chunk = DocumentChunk {
            content: "War and Peace".to_string(),
            metadata: json!({}),
        };
        let response = client_for(&server).invoke("Who wrote it?", &chunk).await.unwrap();

        assert_eq!(response.content, "Tolstoy");
    }

    #[tokio::test]
    async fn test_api_error_maps_to_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "bad request",
                    "type": "invalid_request_error",
                    "param": null,
                    "code": null
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).generate("hi").await.unwrap_err();
        assert!(matches!(err, AppError::LLM(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body("late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server).with_timeout(Some(Duration::from_millis(100)));
        let err = client.generate("hi").await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_model_name() {
        let client = ChatCompletionsClient::openai_compatible(
            String::new(),
            "http://localhost".to_string(),
            "mistral-large-latest".to_string(),
        );
        assert_eq!(client.model_name(), "mistral-large-latest");
    }
}
