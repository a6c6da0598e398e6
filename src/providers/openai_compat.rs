/*!
 * Client for OpenAI-compatible chat-completion endpoints.
 *
 * Covers hosted APIs as well as self-hosted gateways that speak the same
 * wire format. Translation is phrased as a single chat completion with a
 * translator system prompt.
 */

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderRequest, ProviderResponse, ProviderSpec};

/// Chat completion request body
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat message format
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

/// Individual completion choice
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// OpenAI-compatible translation provider
#[derive(Debug)]
pub struct OpenAiCompatProvider {
    spec: ProviderSpec,
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    retry_count: u32,
    retry_backoff_ms: u64,
}

impl OpenAiCompatProvider {
    /// Create a new client.
    ///
    /// `endpoint` is the API base URL; the chat-completions path is appended.
    /// An empty endpoint defaults to the public OpenAI API.
    pub fn new(
        spec: ProviderSpec,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let timeout = Duration::from_millis(spec.target_latency_ms.max(1_000));
        let endpoint = endpoint.into();
        if !endpoint.is_empty() && Url::parse(&endpoint).is_err() {
            warn!(
                "Endpoint '{}' for provider '{}' is not a valid URL; requests will fail",
                endpoint, spec.id
            );
        }
        Self {
            spec,
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint,
            model: model.into(),
            retry_count: 0,
            retry_backoff_ms: 1_000,
        }
    }

    /// Enable client-side retries on transient failures
    pub fn with_retries(mut self, retry_count: u32, retry_backoff_ms: u64) -> Self {
        self.retry_count = retry_count;
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    fn api_url(&self) -> String {
        if self.endpoint.is_empty() {
            "https://api.openai.com/v1/chat/completions".to_string()
        } else {
            format!(
                "{}/v1/chat/completions",
                self.endpoint.trim_end_matches('/')
            )
        }
    }

    fn system_prompt(request: &ProviderRequest) -> String {
        let source = request
            .source_language
            .as_deref()
            .unwrap_or("the detected source language");
        format!(
            "You are a professional translator. Translate the following text from {} to {}. \
             Preserve all formatting, line breaks, and special characters. {} \
             Only respond with the translated text, without any explanations or notes.",
            source,
            request.target_language,
            request.tone.prompt_hint()
        )
    }

    async fn send(&self, body: &ChatRequest) -> Result<ChatResponse, ProviderError> {
        let response = self
            .client
            .post(self.api_url())
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.spec.target_latency_ms)
                } else if e.is_connect() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimitExceeded(message));
            }
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(ProviderError::AuthenticationError(message));
            }
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }

    fn is_transient(error: &ProviderError) -> bool {
        match error {
            ProviderError::ConnectionError(_)
            | ProviderError::Timeout(_)
            | ProviderError::RateLimitExceeded(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    async fn translate(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Self::system_prompt(request),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.text.clone(),
                },
            ],
            temperature: Some(0.3),
            max_tokens: None,
        };

        let start = Instant::now();
        let mut last_error = None;

        for attempt in 0..=self.retry_count {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * attempt as u64;
                debug!(
                    "Retrying provider '{}' (attempt {}/{}) after {} ms",
                    self.spec.id, attempt, self.retry_count, backoff
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            match self.send(&body).await {
                Ok(response) => {
                    let choice = response.choices.into_iter().next().ok_or_else(|| {
                        ProviderError::ParseError("response contained no choices".to_string())
                    })?;
                    return Ok(ProviderResponse {
                        text: choice.message.content,
                        detected_language: request.source_language.clone(),
                        latency_ms: start.elapsed().as_millis() as u64,
                        confidence: self.spec.reliability,
                    });
                }
                Err(error) => {
                    if !Self::is_transient(&error) {
                        return Err(error);
                    }
                    warn!(
                        "Transient failure from provider '{}': {}",
                        self.spec.id, error
                    );
                    last_error = Some(error);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::RequestFailed("no attempt was made".to_string())))
    }
}
