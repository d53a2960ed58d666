use crate::llm::ProviderRegistry;
use crate::types::{Finding, Summary};

pub const UNSUPPORTED_MODEL_SUMMARY: &str = "Error generating summary due to unsupported model.";
pub const FAILED_SUMMARY: &str = "Error generating summary.";

/// Produce the overall summary of a request's findings.
///
/// Never fails; resolution and call errors are logged and replaced by a fixed
/// error summary.
pub async fn generate_summary(
    findings: &[Finding],
    provider: &str,
    registry: &ProviderRegistry,
) -> Summary {
    let client = match registry.resolve(provider) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(%provider, error = %e, "Cannot resolve provider for summary");
            return Summary {
                summary: UNSUPPORTED_MODEL_SUMMARY.to_string(),
            };
        }
    };

    let findings_json = match serde_json::to_string(findings) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize findings for summary");
            return Summary {
                summary: FAILED_SUMMARY.to_string(),
            };
        }
    };

    let prompt = format!(
        "Create a summary based on the following findings: {}",
        findings_json
    );

    match client.generate(&prompt).await {
        Ok(summary) => Summary { summary },
        Err(e) => {
            tracing::error!(%provider, error = %e, "Summary generation failed");
            Summary {
                summary: FAILED_SUMMARY.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMClient, ProviderId};
    use crate::types::{AppError, Result};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct PromptEcho;

    #[async_trait]
    impl LLMClient for PromptEcho {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct Broken;

    #[async_trait]
    impl LLMClient for Broken {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Err(AppError::LLM("503".to_string()))
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }

    fn finding(content: &str) -> Finding {
        Finding {
            title: "T".to_string(),
            page: "1".to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_summary_prompt_contains_findings() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderId::OpenAI, Arc::new(PromptEcho));

        let summary = generate_summary(&[finding("alpha")], "OpenAI", &registry).await;

        assert!(summary
            .summary
            .starts_with("Create a summary based on the following findings: ["));
        assert!(summary.summary.contains("alpha"));
    }

    #[tokio::test]
    async fn test_unresolvable_provider_yields_fixed_text() {
        let registry = ProviderRegistry::new();
        let summary = generate_summary(&[], "Nope", &registry).await;
        assert_eq!(summary.summary, UNSUPPORTED_MODEL_SUMMARY);
    }

    #[tokio::test]
    async fn test_call_failure_yields_fixed_text() {
        let mut registry = ProviderRegistry::new();
        registry.register(ProviderId::Grok, Arc::new(Broken));

        let summary = generate_summary(&[finding("x")], "Grok", &registry).await;
        assert_eq!(summary.summary, FAILED_SUMMARY);
    }
}
