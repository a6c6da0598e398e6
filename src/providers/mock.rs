/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working(spec)` - Always succeeds with translated text
 * - `MockProvider::failing(spec)` - Always fails with an error
 * - `MockProvider::flaky(spec, n)` - Fails the first n calls, then succeeds
 * - `MockProvider::slow(spec, ms)` - Succeeds after a delay (timeout testing)
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rand::Rng;

use crate::errors::ProviderError;
use crate::providers::{DetectedLanguage, Provider, ProviderRequest, ProviderResponse, ProviderSpec};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Always fails with an API error
    Failing,
    /// Fails the first `fail_count` calls, then succeeds
    Flaky { fail_count: usize },
    /// Succeeds after a delay, optionally with random jitter on top
    Slow { delay_ms: u64, jitter_ms: u64 },
    /// Returns an empty translation
    Empty,
}

/// Mock provider for exercising router and replay behavior
#[derive(Debug)]
pub struct MockProvider {
    spec: ProviderSpec,
    behavior: MockBehavior,
    /// Shared call counter, observable from tests
    call_count: Arc<AtomicUsize>,
    /// Language returned by `detect`, when set
    detect_language: Option<DetectedLanguage>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&ProviderRequest) -> String>,
}

impl MockProvider {
    pub fn new(spec: ProviderSpec, behavior: MockBehavior) -> Self {
        Self {
            spec,
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            detect_language: None,
            custom_response: None,
        }
    }

    /// Mock that always succeeds
    pub fn working(spec: ProviderSpec) -> Self {
        Self::new(spec, MockBehavior::Working)
    }

    /// Mock that always errors
    pub fn failing(spec: ProviderSpec) -> Self {
        Self::new(spec, MockBehavior::Failing)
    }

    /// Mock that fails the first `fail_count` calls, then succeeds
    pub fn flaky(spec: ProviderSpec, fail_count: usize) -> Self {
        Self::new(spec, MockBehavior::Flaky { fail_count })
    }

    /// Mock that sleeps before answering
    pub fn slow(spec: ProviderSpec, delay_ms: u64) -> Self {
        Self::new(spec, MockBehavior::Slow {
            delay_ms,
            jitter_ms: 0,
        })
    }

    /// Mock that sleeps a randomized duration in `[delay_ms, delay_ms + jitter_ms]`
    pub fn slow_with_jitter(spec: ProviderSpec, delay_ms: u64, jitter_ms: u64) -> Self {
        Self::new(spec, MockBehavior::Slow {
            delay_ms,
            jitter_ms,
        })
    }

    /// Make `detect` answer with the given language and confidence
    pub fn with_detection(mut self, language: &str, confidence: f64) -> Self {
        self.detect_language = Some(DetectedLanguage {
            language: language.to_string(),
            confidence,
        });
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&ProviderRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of translate calls made so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Handle to the shared call counter
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.call_count)
    }

    fn success(&self, request: &ProviderRequest) -> ProviderResponse {
        let text = if let Some(generator) = self.custom_response {
            generator(request)
        } else {
            format!("[{}] {}", request.target_language, request.text)
        };
        ProviderResponse {
            text,
            detected_language: request
                .source_language
                .clone()
                .or_else(|| Some("en".to_string())),
            latency_ms: 5,
            confidence: self.spec.reliability,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    async fn translate(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            MockBehavior::Working => Ok(self.success(request)),

            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated provider failure".to_string(),
            }),

            MockBehavior::Flaky { fail_count } => {
                if count < fail_count {
                    Err(ProviderError::ApiError {
                        status_code: 503,
                        message: format!("Simulated transient failure (call #{})", count + 1),
                    })
                } else {
                    Ok(self.success(request))
                }
            }

            MockBehavior::Slow {
                delay_ms,
                jitter_ms,
            } => {
                let mut delay = delay_ms;
                if jitter_ms > 0 {
                    delay += rand::rng().random_range(0..=jitter_ms);
                }
                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                Ok(self.success(request))
            }

            MockBehavior::Empty => Ok(ProviderResponse {
                text: String::new(),
                detected_language: None,
                latency_ms: 1,
                confidence: 0.0,
            }),
        }
    }

    async fn detect(&self, _text: &str) -> Result<Option<DetectedLanguage>, ProviderError> {
        Ok(self.detect_language.clone())
    }
}
