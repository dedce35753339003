use std::sync::Arc;
use std::time::Duration;

use crate::core::config::LlmSettings;
use crate::core::errors::ApiError;
use crate::llm::groq::GroqProvider;
use crate::llm::provider::LlmProvider;
use crate::llm::types::ChatRequest;

/// A provider bound to one model and one client-side deadline.
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn LlmProvider>,
    model: String,
    timeout: Duration,
}

impl LlmService {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            model: model.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &LlmSettings, client: reqwest::Client) -> Self {
        let provider = GroqProvider::new(settings, client);
        Self::new(Arc::new(provider), settings.model.clone(), settings.timeout)
    }

    /// Single attempt, no retries.
    pub async fn chat(&self, request: ChatRequest) -> Result<String, ApiError> {
        match tokio::time::timeout(self.timeout, self.provider.chat(request, &self.model)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Internal(format!(
                "{} completion timed out after {:?}",
                self.provider.name(),
                self.timeout
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;
    use async_trait::async_trait;

    struct StalledProvider;

    #[async_trait]
    impl LlmProvider for StalledProvider {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn chat(&self, _request: ChatRequest, _model_id: &str) -> Result<String, ApiError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    struct EchoModel;

    #[async_trait]
    impl LlmProvider for EchoModel {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, _request: ChatRequest, model_id: &str) -> Result<String, ApiError> {
            Ok(model_id.to_string())
        }
    }

    #[tokio::test]
    async fn chat_times_out_instead_of_hanging() {
        let service = LlmService::new(Arc::new(StalledProvider), "m", Duration::from_millis(50));
        let err = service
            .chat(ChatRequest::new(vec![ChatMessage::user("hola")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn chat_passes_bound_model_to_provider() {
        let service = LlmService::new(Arc::new(EchoModel), "llama-3.3-70b-versatile", Duration::from_secs(1));
        let reply = service.chat(ChatRequest::new(vec![])).await.unwrap();
        assert_eq!(reply, "llama-3.3-70b-versatile");
    }
}
