use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use backoff::ExponentialBackoffBuilder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, instrument, warn};

use super::error::LlmError;
use super::types::{Message, MessagesRequest, MessagesResponse};
use crate::domain::models::LlmConfig;

const API_VERSION: &str = "2023-06-01";

/// Messages API client.
///
/// Every attempt first waits on a direct `governor` limiter; transient
/// failures are retried with exponential backoff until `max_retries`
/// retries have been spent.
pub struct LlmClient {
    http: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    limiter: DefaultDirectRateLimiter,
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .resolved_api_key()
            .context("No API key configured (set llm.api_key or ANTHROPIC_API_KEY)")?;
        let rps = NonZeroU32::new(config.requests_per_second)
            .context("llm.requests_per_second must be positive")?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            limiter: RateLimiter::direct(Quota::per_second(rps)),
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user prompt and return the full response.
    #[instrument(skip(self, system, prompt), fields(model = %self.model))]
    pub async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<MessagesResponse, LlmError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: system.map(str::to_string),
            messages: vec![Message::user(prompt)],
        };

        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build();
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;
        let request = &request;

        backoff::future::retry(policy, || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            self.limiter.until_ready().await;

            match self.send(request).await {
                Ok(response) => Ok(response),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    warn!(attempt = attempt + 1, error = %err, "Transient API error, retrying");
                    Err(backoff::Error::transient(err))
                }
                Err(err) => Err(backoff::Error::permanent(err)),
            }
        })
        .await
    }

    async fn send(&self, request: &MessagesRequest) -> Result<MessagesResponse, LlmError> {
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(LlmError::from_status(status, body));
        }

        let parsed: MessagesResponse = response.json().await?;
        debug!(
            id = %parsed.id,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "Received API response"
        );
        Ok(parsed)
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| LlmError::InvalidRequest("API key is not a valid header value".to_string()))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockito::Server;

    pub(crate) fn test_config(base_url: String) -> LlmConfig {
        LlmConfig {
            base_url,
            api_key: Some("test-api-key".to_string()),
            model: "test-model".to_string(),
            requests_per_second: 50,
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            ..LlmConfig::default()
        }
    }

    pub(crate) fn response_body(text: &str) -> String {
        serde_json::json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "test-model",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 12, "output_tokens": 3}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_complete_sends_expected_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-api-key")
            .match_header("anthropic-version", API_VERSION)
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(response_body("Hello"))
            .create_async()
            .await;

        let client = LlmClient::new(&test_config(server.url())).unwrap();
        let response = client.complete(Some("be brief"), "Say hello").await.unwrap();

        assert_eq!(response.text(), "Hello");
        assert_eq!(response.usage.input_tokens, 12);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_up_to_limit() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(503)
            .with_body("unavailable")
            .expect(3)
            .create_async()
            .await;

        let client = LlmClient::new(&test_config(server.url())).unwrap();
        let err = client.complete(None, "hi").await.unwrap_err();

        assert!(matches!(err, LlmError::ServerError(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_permanent_errors_fail_fast() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body("invalid x-api-key")
            .expect(1)
            .create_async()
            .await;

        let client = LlmClient::new(&test_config(server.url())).unwrap();
        let err = client.complete(None, "hi").await.unwrap_err();

        assert!(matches!(err, LlmError::AuthenticationFailed(_)));
        mock.assert_async().await;
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let config = LlmConfig {
            api_key: None,
            ..LlmConfig::default()
        };
        let result = temp_env::with_var_unset("ANTHROPIC_API_KEY", || LlmClient::new(&config));
        assert!(result.is_err());
    }
}
