/*!
 * Provider implementations for interchangeable translation backends.
 *
 * This module defines the common trait every backend implements, the
 * immutable [`ProviderSpec`] describing a backend's cost/latency/compliance
 * profile, and the wire types exchanged with a backend:
 * - `openai_compat`: client for OpenAI-compatible chat-completion endpoints
 * - `mock`: scriptable in-process provider for tests
 */

use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::request::Tone;

pub mod mock;
pub mod openai_compat;

/// Request sent to a single provider
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Text to translate
    pub text: String,
    /// Source language, when known
    pub source_language: Option<String>,
    /// Target language
    pub target_language: String,
    /// Desired tone
    pub tone: Tone,
}

impl ProviderRequest {
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_language: None,
            target_language: target_language.into(),
            tone: Tone::Neutral,
        }
    }

    pub fn with_source_language(mut self, language: impl Into<String>) -> Self {
        self.source_language = Some(language.into());
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }
}

/// Response from a single provider
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    /// Translated text
    pub text: String,
    /// Source language the provider believes it translated from
    pub detected_language: Option<String>,
    /// Provider-side latency
    pub latency_ms: u64,
    /// Provider confidence in the translation, 0.0 to 1.0
    pub confidence: f64,
}

/// Detection result from a provider's optional `detect` capability
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedLanguage {
    /// ISO 639 language code
    pub language: String,
    /// Detector confidence, 0.0 to 1.0
    pub confidence: f64,
}

/// Common trait for all translation providers.
///
/// Implementations are used interchangeably by the router; `detect` is
/// optional and defaults to "no opinion".
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The immutable profile of this provider
    fn spec(&self) -> &ProviderSpec;

    /// Translate a single request
    async fn translate(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Best-effort source language detection
    async fn detect(&self, _text: &str) -> Result<Option<DetectedLanguage>, ProviderError> {
        Ok(None)
    }
}

/// Weights for the combined provider score
#[derive(Debug, Clone, Copy)]
pub struct ScoreWeights {
    pub quality: f64,
    pub latency: f64,
    pub cost: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            quality: 0.5,
            latency: 0.25,
            cost: 0.25,
        }
    }
}

/// Immutable profile of a translation backend.
///
/// Used read-only by the router (cost, failover order, timeout) and by the
/// compliance gateway (region and certification tags).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSpec {
    /// Stable identifier
    pub id: String,

    /// Cost per source character, USD
    pub cost_per_char_usd: f64,

    /// Latency target; calls exceeding it are treated as failed
    #[serde(default = "default_target_latency_ms")]
    pub target_latency_ms: u64,

    /// Historical reliability, 0.0 to 1.0
    #[serde(default = "default_reliability")]
    pub reliability: f64,

    /// Regions this provider is allowed to serve
    #[serde(default)]
    pub region_tags: Vec<String>,

    /// Certifications this provider carries
    #[serde(default)]
    pub certification_tags: Vec<String>,
}

fn default_target_latency_ms() -> u64 {
    5_000
}

fn default_reliability() -> f64 {
    0.9
}

impl ProviderSpec {
    pub fn new(id: impl Into<String>, cost_per_char_usd: f64) -> Self {
        Self {
            id: id.into(),
            cost_per_char_usd,
            target_latency_ms: default_target_latency_ms(),
            reliability: default_reliability(),
            region_tags: Vec::new(),
            certification_tags: Vec::new(),
        }
    }

    pub fn with_target_latency_ms(mut self, target_latency_ms: u64) -> Self {
        self.target_latency_ms = target_latency_ms;
        self
    }

    pub fn with_reliability(mut self, reliability: f64) -> Self {
        self.reliability = reliability.clamp(0.0, 1.0);
        self
    }

    pub fn with_regions(mut self, region_tags: Vec<String>) -> Self {
        self.region_tags = region_tags;
        self
    }

    pub fn with_certifications(mut self, certification_tags: Vec<String>) -> Self {
        self.certification_tags = certification_tags;
        self
    }

    /// Cost of translating `chars` source characters with this provider
    pub fn cost_for_chars(&self, chars: usize) -> f64 {
        self.cost_per_char_usd * chars as f64
    }

    // Scoring below is for offline ranking and reporting only. Routing
    // itself always follows the configured priority order.

    /// Reliability-based quality score, 0.0 to 1.0
    pub fn quality_score(&self) -> f64 {
        self.reliability.clamp(0.0, 1.0)
    }

    /// Latency score: 1.0 at 0 ms, approaching 0.0 as the target grows
    pub fn latency_score(&self) -> f64 {
        1.0 / (1.0 + self.target_latency_ms as f64 / 1_000.0)
    }

    /// Cost score relative to a reference per-char cost; 1.0 when free
    pub fn cost_score(&self, reference_cost_per_char: f64) -> f64 {
        if reference_cost_per_char <= 0.0 {
            return 1.0;
        }
        (1.0 - self.cost_per_char_usd / reference_cost_per_char).clamp(0.0, 1.0)
    }

    /// Weighted combination of the three scores
    pub fn combined_score(&self, weights: &ScoreWeights, reference_cost_per_char: f64) -> f64 {
        weights.quality * self.quality_score()
            + weights.latency * self.latency_score()
            + weights.cost * self.cost_score(reference_cost_per_char)
    }
}

/// Rank provider specs by combined score, best first. Offline reporting
/// helper; does not influence the failover chain.
pub fn rank_providers<'a>(
    specs: impl IntoIterator<Item = &'a ProviderSpec>,
    weights: &ScoreWeights,
) -> Vec<(&'a ProviderSpec, f64)> {
    let specs: Vec<&ProviderSpec> = specs.into_iter().collect();
    let reference_cost = specs
        .iter()
        .map(|s| s.cost_per_char_usd)
        .fold(0.0_f64, f64::max);

    let mut ranked: Vec<(&ProviderSpec, f64)> = specs
        .into_iter()
        .map(|s| (s, s.combined_score(weights, reference_cost)))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}
