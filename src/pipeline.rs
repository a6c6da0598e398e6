/*!
 * Orchestration layer above the router.
 *
 * Validates incoming text, frames router results for different caller
 * intents (plain translation, reply payload, tone rewrite) and hands
 * non-routable requests off to the offline draft store. All routing
 * semantics live in the router; this layer only shapes inputs and outputs.
 */

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use log::{debug, info};

use crate::drafts::{DraftStore, OfflineDraft};
use crate::errors::RouteError;
use crate::glossary::{GlossaryApplicationResult, GlossaryContext, TermResolution};
use crate::providers::DetectedLanguage;
use crate::request::{RoutedTranslation, TranslationRequest};
use crate::router::TranslationRouter;

/// Default upper bound on translatable text length, in characters
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 5000;

/// Outcome of a pipeline translate call
#[derive(Debug)]
pub enum TranslateOutcome {
    /// Translation finished; no caller action needed
    Completed(RoutedTranslation),

    /// Glossary conflicts need caller decisions before the text is final.
    ///
    /// The translation carries the partial result with conflicted terms left
    /// in place; `unresolved_terms` lists what the caller must decide on.
    NeedsGlossaryResolution {
        translation: RoutedTranslation,
        unresolved_terms: Vec<String>,
    },
}

impl TranslateOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, TranslateOutcome::Completed(_))
    }

    pub fn translation(&self) -> &RoutedTranslation {
        match self {
            TranslateOutcome::Completed(t) => t,
            TranslateOutcome::NeedsGlossaryResolution { translation, .. } => translation,
        }
    }
}

/// A translation framed as a reply, with metadata for card rendering
#[derive(Debug)]
pub struct TranslatedReply {
    pub text: String,
    /// Rendering hints for the downstream UI layer
    pub metadata: HashMap<String, String>,
}

/// Acknowledgment returned when a request is queued for offline replay
#[derive(Debug)]
pub struct DraftHandle {
    pub draft_id: String,
    pub user_id: String,
}

/// Entry point consumed by the API layer and the replay engine
pub struct TranslationPipeline {
    router: TranslationRouter,
    drafts: Arc<dyn DraftStore>,
    max_text_length: usize,
}

impl TranslationPipeline {
    pub fn new(router: TranslationRouter, drafts: Arc<dyn DraftStore>) -> Self {
        Self {
            router,
            drafts,
            max_text_length: DEFAULT_MAX_TEXT_LENGTH,
        }
    }

    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.max_text_length = max_text_length;
        self
    }

    pub fn router(&self) -> &TranslationRouter {
        &self.router
    }

    pub fn drafts(&self) -> &Arc<dyn DraftStore> {
        &self.drafts
    }

    /// Translate one request.
    ///
    /// Length validation happens here so the router never sees a request it
    /// cannot charge for. Glossary conflicts surface as
    /// [`TranslateOutcome::NeedsGlossaryResolution`] rather than an error;
    /// the routing itself succeeded and was charged.
    pub async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslateOutcome, RouteError> {
        self.validate(&request.text)?;

        let translation = self.router.route(request).await?;

        if let Some(glossary) = &translation.glossary {
            if glossary.requires_resolution {
                let unresolved_terms: Vec<String> = glossary
                    .unresolved_terms()
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                debug!(
                    "Translation for user {} has {} unresolved glossary term(s)",
                    request.user_id,
                    unresolved_terms.len()
                );
                return Ok(TranslateOutcome::NeedsGlossaryResolution {
                    translation,
                    unresolved_terms,
                });
            }
        }

        Ok(TranslateOutcome::Completed(translation))
    }

    /// Translate the request into its primary and additional target
    /// languages concurrently.
    ///
    /// Results come back in target order, one per distinct target. Each
    /// target is routed and charged independently, so one blocked target
    /// does not fail the others.
    pub async fn translate_targets(
        &self,
        request: &TranslationRequest,
    ) -> Vec<(String, Result<TranslateOutcome, RouteError>)> {
        let mut targets = vec![request.target_language.clone()];
        for target in &request.additional_targets {
            if !targets.contains(target) {
                targets.push(target.clone());
            }
        }

        let pending = targets.iter().map(|target| {
            let mut per_target = request.clone();
            per_target.target_language = target.clone();
            per_target.additional_targets.clear();
            async move { self.translate(&per_target).await }
        });
        let results = futures::future::join_all(pending).await;
        targets.into_iter().zip(results).collect()
    }

    /// Translate and frame the result as a reply payload
    pub async fn reply(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslatedReply, RouteError> {
        let outcome = self.translate(request).await?;
        let translation = outcome.translation();

        let mut metadata = HashMap::new();
        metadata.insert("provider_id".to_string(), translation.provider_id.clone());
        metadata.insert(
            "source_language".to_string(),
            translation.detected_language.clone(),
        );
        metadata.insert(
            "target_language".to_string(),
            request.target_language.clone(),
        );
        metadata.insert("latency_ms".to_string(), translation.latency_ms.to_string());
        metadata.insert("tone".to_string(), format!("{:?}", request.tone));
        if let TranslateOutcome::NeedsGlossaryResolution {
            unresolved_terms, ..
        } = &outcome
        {
            metadata.insert(
                "unresolved_terms".to_string(),
                unresolved_terms.join(","),
            );
        }

        Ok(TranslatedReply {
            text: translation.text.clone(),
            metadata,
        })
    }

    /// Restate text in the requested tone.
    ///
    /// A rewrite is a translation whose target equals the source language;
    /// the tone hint carried on the request does the actual restyling at the
    /// provider.
    pub async fn rewrite(
        &self,
        request: &TranslationRequest,
    ) -> Result<RoutedTranslation, RouteError> {
        self.validate(&request.text)?;
        let mut rewrite_request = request.clone();
        if rewrite_request.source_language.is_none() {
            let detected = self.detect_language(&request.text).await;
            rewrite_request.target_language = detected.language.clone();
            rewrite_request.source_language =
                Some(crate::request::DeclaredLanguage::certain(detected.language));
        } else if let Some(declared) = &rewrite_request.source_language {
            rewrite_request.target_language = declared.code.clone();
        }
        self.router.route(&rewrite_request).await
    }

    /// Queue a request as an offline draft for later replay
    pub async fn queue_draft(&self, request: &TranslationRequest) -> Result<DraftHandle> {
        self.validate(&request.text)
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        let draft = OfflineDraft::new(
            &request.user_id,
            &request.tenant_id,
            &request.text,
            &request.target_language,
        );
        let saved = self.drafts.save(draft).await?;
        info!(
            "Queued draft {} for user {} (target: {})",
            saved.id, saved.user_id, saved.target_language
        );

        Ok(DraftHandle {
            draft_id: saved.id,
            user_id: saved.user_id,
        })
    }

    /// Re-run glossary substitution over already-translated text with fresh
    /// caller decisions
    pub fn apply_glossary(
        &self,
        text: &str,
        channel_id: Option<&str>,
        decisions: &HashMap<String, TermResolution>,
    ) -> GlossaryApplicationResult {
        let ctx = GlossaryContext {
            channel_id: channel_id.map(str::to_string),
        };
        self.router.glossary().apply(text, &ctx, decisions)
    }

    /// Thin pass-through to the detector, for UI pre-fill
    pub async fn detect_language(&self, text: &str) -> DetectedLanguage {
        self.router.detect_language(text).await
    }

    fn validate(&self, text: &str) -> Result<(), RouteError> {
        if text.trim().is_empty() {
            return Err(RouteError::EmptyText);
        }
        let length = text.chars().count();
        if length > self.max_text_length {
            return Err(RouteError::TextTooLong {
                length,
                max: self.max_text_length,
            });
        }
        Ok(())
    }
}
