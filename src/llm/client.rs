use crate::config::LlmConfig;
use crate::llm::prompt::ChatMessage;
use crate::llm::{CompletionBackend, InferenceError};
use crate::util::truncate_detail;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct ChatCompletionClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: usize,
}

impl ChatCompletionClient {
    pub fn new(config: &LlmConfig) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn log_failure(error: &InferenceError) {
        // Detail is truncated; the bearer credential never reaches this path.
        match error {
            InferenceError::Config(msg) => warn!("inference config failure: {}", msg),
            InferenceError::Cancelled => debug!("inference call cancelled by caller"),
            InferenceError::Transport(msg) => {
                warn!("inference transport failure: {}", truncate_detail(msg, 256))
            }
            InferenceError::Provider { status, body } => warn!(
                "inference provider failure: status {} body {}",
                status,
                truncate_detail(body, 256)
            ),
        }
    }

    async fn try_complete(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError> {
        // Credential is read at call time; absence fails before any network I/O.
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| InferenceError::Config("no API key configured".to_string()))?;

        if cancel.is_cancelled() {
            return Err(InferenceError::Cancelled);
        }

        let request = PromptRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!("sending chat-completion request to {}", self.api_url);

        let send = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(InferenceError::Cancelled),
            result = send => result.map_err(|e| InferenceError::Transport(e.to_string()))?,
        };

        let status = response.status();

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(InferenceError::Cancelled),
            result = response.text() => {
                result.map_err(|e| InferenceError::Transport(e.to_string()))?
            }
        };

        if !status.is_success() {
            // Non-success bodies are captured raw for diagnostics, not parsed.
            return Err(InferenceError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl CompletionBackend for ChatCompletionClient {
    /// One attempt, one provider, no retry. The raw success body goes to the
    /// extractor; every failure is classified and logged here.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        cancel: &CancellationToken,
    ) -> Result<String, InferenceError> {
        let result = self.try_complete(messages, cancel).await;
        if let Err(error) = &result {
            Self::log_failure(error);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::prompt::build_messages;

    fn config_without_key() -> LlmConfig {
        LlmConfig {
            api_url: "https://example.invalid/v1/chat/completions".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.1,
            max_tokens: 2000,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn missing_credential_fails_before_any_network_call() {
        let client = ChatCompletionClient::new(&config_without_key()).unwrap();
        let messages = build_messages("schema", "question");
        let err = client
            .complete(&messages, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::Config(_)));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_without_sending() {
        let mut config = config_without_key();
        config.api_key = Some("test-key".to_string());
        let client = ChatCompletionClient::new(&config).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let messages = build_messages("schema", "question");
        let err = client.complete(&messages, &token).await.unwrap_err();
        assert!(matches!(err, InferenceError::Cancelled));
    }
}
