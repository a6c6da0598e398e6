/*!
 * Request and result types shared across the routing pipeline.
 */

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::glossary::{GlossaryApplicationResult, TermResolution};

/// Desired register for the translated text
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Neutral,
    Formal,
    Casual,
    Technical,
}

impl Tone {
    /// Instruction fragment appended to provider prompts
    pub fn prompt_hint(&self) -> &'static str {
        match self {
            Self::Neutral => "Use a neutral tone.",
            Self::Formal => "Use a formal, professional tone.",
            Self::Casual => "Use a relaxed, conversational tone.",
            Self::Technical => "Use precise technical vocabulary.",
        }
    }
}

/// A declared source language with the caller's confidence in it.
///
/// A declaration with confidence 1.0 is taken as-is by the router; anything
/// lower still goes through detection.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DeclaredLanguage {
    /// ISO 639 language code
    pub code: String,
    /// Caller confidence in the declaration, 0.0 to 1.0
    pub confidence: f64,
}

impl DeclaredLanguage {
    pub fn certain(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            confidence: 1.0,
        }
    }

    pub fn guessed(code: impl Into<String>, confidence: f64) -> Self {
        Self {
            code: code.into(),
            confidence,
        }
    }
}

/// A translation request as submitted by the caller
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TranslationRequest {
    /// Text to translate
    pub text: String,

    /// Optional declared source language
    #[serde(default)]
    pub source_language: Option<DeclaredLanguage>,

    /// Primary target language (ISO 639 code)
    pub target_language: String,

    /// Additional target languages, translated on demand by the caller
    #[serde(default)]
    pub additional_targets: Vec<String>,

    /// Tenant the request belongs to
    pub tenant_id: String,

    /// User that submitted the request
    pub user_id: String,

    /// Channel the request originated from, if any
    #[serde(default)]
    pub channel_id: Option<String>,

    /// Desired tone of the output
    #[serde(default)]
    pub tone: Tone,

    /// Whether glossary substitution should run over the result
    #[serde(default = "default_use_glossary")]
    pub use_glossary: bool,

    /// Caller-supplied conflict decisions, keyed by source term
    /// (case-insensitive; keys are stored lowercased)
    #[serde(default)]
    pub glossary_decisions: HashMap<String, TermResolution>,
}

fn default_use_glossary() -> bool {
    true
}

impl TranslationRequest {
    /// Create a minimal request; remaining fields take their defaults
    pub fn new(
        text: impl Into<String>,
        target_language: impl Into<String>,
        tenant_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            use_glossary: true,
            ..Default::default()
        }
    }

    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_source_language(mut self, declared: DeclaredLanguage) -> Self {
        self.source_language = Some(declared);
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_decision(mut self, term: &str, resolution: TermResolution) -> Self {
        self.glossary_decisions.insert(term.to_lowercase(), resolution);
        self
    }

    /// Look up a conflict decision for a term, case-insensitively
    pub fn decision_for(&self, term: &str) -> TermResolution {
        self.glossary_decisions
            .get(&term.to_lowercase())
            .copied()
            .unwrap_or(TermResolution::Unspecified)
    }
}

/// A successful routing outcome returned by the router
#[derive(Debug, Clone)]
pub struct RoutedTranslation {
    /// Final text after glossary application
    pub text: String,

    /// Source language actually used (declared or detected)
    pub detected_language: String,

    /// Identifier of the provider that produced the result
    pub provider_id: String,

    /// End-to-end latency of the winning provider call
    pub latency_ms: u64,

    /// Charge applied to the budget for this request, in USD
    pub cost_usd: f64,

    /// Glossary application detail, present when the glossary ran
    pub glossary: Option<GlossaryApplicationResult>,
}
