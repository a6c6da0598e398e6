/*!
 * Translation routing across a failover chain of providers.
 *
 * Per request the router runs: detect source language, then for each
 * provider in configured priority order: compliance check, invocation with
 * bounded retries and a per-call timeout at the provider's latency target,
 * budget charge on success, glossary application, audit record. The first
 * provider to succeed wins; the chain order is fixed, not an auction.
 *
 * When every provider fails and all failures were compliance violations the
 * router fails fast with one aggregated compliance error; otherwise it
 * reports every provider's error code and message.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};

use crate::audit::{AuditRecord, AuditSink, source_fingerprint};
use crate::budget::BudgetGuard;
use crate::compliance::{ComplianceEvaluation, ComplianceGateway};
use crate::detection::LanguageDetector;
use crate::errors::{ProviderError, ProviderFailure, RouteError};
use crate::glossary::{GlossaryContext, GlossaryResolver};
use crate::providers::{Provider, ProviderRequest, ProviderResponse};
use crate::request::{RoutedTranslation, TranslationRequest};

/// Default number of retries per provider after the first attempt
const DEFAULT_RETRY_COUNT: u32 = 2;

/// Default delay between attempts on the same provider
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Composes compliance, budget, glossary and detection into one
/// admission-checked, failover-capable translate operation.
pub struct TranslationRouter {
    /// Failover chain, in configured priority order
    providers: Vec<Arc<dyn Provider>>,
    compliance: ComplianceGateway,
    budget: Arc<BudgetGuard>,
    glossary: Arc<GlossaryResolver>,
    detector: LanguageDetector,
    audit: Arc<dyn AuditSink>,
    retry_count: u32,
    retry_backoff: Duration,
}

impl TranslationRouter {
    pub fn new(
        providers: Vec<Arc<dyn Provider>>,
        compliance: ComplianceGateway,
        budget: Arc<BudgetGuard>,
        glossary: Arc<GlossaryResolver>,
        detector: LanguageDetector,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            providers,
            compliance,
            budget,
            glossary,
            detector,
            audit,
            retry_count: DEFAULT_RETRY_COUNT,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    /// Override the per-provider retry budget and backoff delay
    pub fn with_retry(mut self, retry_count: u32, retry_backoff: Duration) -> Self {
        self.retry_count = retry_count;
        self.retry_backoff = retry_backoff;
        self
    }

    pub fn budget(&self) -> &BudgetGuard {
        &self.budget
    }

    pub fn glossary(&self) -> &GlossaryResolver {
        &self.glossary
    }

    /// Thin pass-through to the detector, for UI pre-fill use cases
    pub async fn detect_language(&self, text: &str) -> crate::providers::DetectedLanguage {
        self.detector.detect(text).await
    }

    /// Route one request through the failover chain.
    pub async fn route(&self, request: &TranslationRequest) -> Result<RoutedTranslation, RouteError> {
        let source_language = self.resolve_source_language(request).await;

        let mut failures: Vec<ProviderFailure> = Vec::new();
        let mut blocked_evaluations: Vec<ComplianceEvaluation> = Vec::new();
        let mut saw_non_compliance_failure = false;

        for provider in &self.providers {
            let spec = provider.spec();

            let evaluation =
                self.compliance
                    .evaluate(&request.text, spec, &request.target_language);
            if !evaluation.allowed {
                debug!(
                    "Skipping provider '{}': {}",
                    spec.id,
                    evaluation.violation_summary()
                );
                failures.push(ProviderFailure::new(
                    &spec.id,
                    "compliance_blocked",
                    evaluation.violation_summary(),
                ));
                blocked_evaluations.push(evaluation);
                continue;
            }

            let provider_request = ProviderRequest {
                text: request.text.clone(),
                source_language: Some(source_language.clone()),
                target_language: request.target_language.clone(),
                tone: request.tone,
            };

            match self.invoke_with_retry(provider.as_ref(), &provider_request).await {
                Ok(response) => {
                    return self
                        .finish(request, provider.as_ref(), response, &source_language)
                        .await;
                }
                Err(error) => {
                    warn!("Provider '{}' failed: {}", spec.id, error);
                    saw_non_compliance_failure = true;
                    failures.push(ProviderFailure::new(&spec.id, error.code(), error.to_string()));
                }
            }
        }

        if !saw_non_compliance_failure && !blocked_evaluations.is_empty() {
            return Err(RouteError::ComplianceBlocked(ComplianceEvaluation::aggregate(
                blocked_evaluations,
            )));
        }
        Err(RouteError::AllProvidersFailed(failures))
    }

    /// Declared source language is taken as-is only at full confidence;
    /// anything else goes through the detector.
    async fn resolve_source_language(&self, request: &TranslationRequest) -> String {
        if let Some(declared) = &request.source_language {
            if declared.confidence >= 1.0 {
                return declared.code.clone();
            }
        }
        self.detector.detect(&request.text).await.language
    }

    /// One provider, up to `1 + retry_count` attempts, each bounded by the
    /// provider's latency target. Only the last error is reported.
    async fn invoke_with_retry(
        &self,
        provider: &dyn Provider,
        request: &ProviderRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        let spec = provider.spec();
        let call_timeout = Duration::from_millis(spec.target_latency_ms);
        let mut last_error = ProviderError::RequestFailed("no attempt was made".to_string());

        for attempt in 0..=self.retry_count {
            if attempt > 0 {
                tokio::time::sleep(self.retry_backoff).await;
            }

            match tokio::time::timeout(call_timeout, provider.translate(request)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(error)) => {
                    debug!(
                        "Provider '{}' attempt {}/{} failed: {}",
                        spec.id,
                        attempt + 1,
                        self.retry_count + 1,
                        error
                    );
                    last_error = error;
                }
                Err(_) => {
                    debug!(
                        "Provider '{}' attempt {}/{} timed out after {} ms",
                        spec.id,
                        attempt + 1,
                        self.retry_count + 1,
                        spec.target_latency_ms
                    );
                    last_error = ProviderError::Timeout(spec.target_latency_ms);
                }
            }
        }

        Err(last_error)
    }

    /// Budget charge, glossary application and audit record for a winning
    /// provider response.
    async fn finish(
        &self,
        request: &TranslationRequest,
        provider: &dyn Provider,
        response: ProviderResponse,
        source_language: &str,
    ) -> Result<RoutedTranslation, RouteError> {
        let spec = provider.spec();
        let char_count = request.text.chars().count();
        let cost_usd = spec.cost_for_chars(char_count);

        // Charged once per successful invocation, never per retry
        self.budget.charge(cost_usd)?;

        let detected_language = response
            .detected_language
            .unwrap_or_else(|| source_language.to_string());

        let (text, glossary_result) = if request.use_glossary {
            let ctx = GlossaryContext {
                channel_id: request.channel_id.clone(),
            };
            let applied = self
                .glossary
                .apply(&response.text, &ctx, &request.glossary_decisions);
            (applied.text.clone(), Some(applied))
        } else {
            (response.text, None)
        };

        let mut metadata = HashMap::new();
        metadata.insert("detected_language".to_string(), detected_language.clone());
        metadata.insert("cost_usd".to_string(), format!("{cost_usd:.6}"));
        metadata.insert(
            "target_language".to_string(),
            request.target_language.clone(),
        );

        self.audit
            .record(AuditRecord {
                user_id: request.user_id.clone(),
                tenant_id: request.tenant_id.clone(),
                source_fingerprint: source_fingerprint(&request.text),
                translated_text: text.clone(),
                model_id: spec.id.clone(),
                latency_ms: response.latency_ms,
                metadata,
                recorded_at: Utc::now(),
            })
            .await;

        info!(
            "Routed request for tenant '{}' via '{}' ({} chars, {:.6} USD)",
            request.tenant_id, spec.id, char_count, cost_usd
        );

        Ok(RoutedTranslation {
            text,
            detected_language,
            provider_id: spec.id.clone(),
            latency_ms: response.latency_ms,
            cost_usd,
            glossary: glossary_result,
        })
    }
}
