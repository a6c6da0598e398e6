/*!
 * Best-effort source language detection.
 *
 * The detector asks each configured provider that exposes a `detect`
 * capability in turn, taking the first sufficiently confident answer. When
 * no provider has an opinion it falls back to a cheap script-range
 * heuristic, so the router always has something to work with.
 */

use std::sync::Arc;

use log::debug;

use crate::language_utils::normalize_language_code;
use crate::providers::{DetectedLanguage, Provider};

/// Confidence below which a provider's answer is treated as a guess only
const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

/// Confidence attached to heuristic fallback answers
const HEURISTIC_CONFIDENCE: f64 = 0.3;

/// Language detector backed by zero or more providers
pub struct LanguageDetector {
    providers: Vec<Arc<dyn Provider>>,
    min_confidence: f64,
}

impl LanguageDetector {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    /// Detector with no providers; heuristics only
    pub fn heuristic_only() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// Detect the source language of `text`.
    ///
    /// Providers are consulted in order; the first answer at or above the
    /// confidence floor wins. Failing that, the best provider guess is used,
    /// and failing that the script heuristic. Provider errors are logged and
    /// skipped, never propagated.
    pub async fn detect(&self, text: &str) -> DetectedLanguage {
        let mut best: Option<DetectedLanguage> = None;

        for provider in &self.providers {
            match provider.detect(text).await {
                Ok(Some(detected)) => {
                    if detected.confidence >= self.min_confidence {
                        return self.normalized(detected);
                    }
                    let better = best
                        .as_ref()
                        .map(|b| detected.confidence > b.confidence)
                        .unwrap_or(true);
                    if better {
                        best = Some(detected);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    debug!(
                        "Detection provider '{}' failed: {}",
                        provider.spec().id,
                        error
                    );
                }
            }
        }

        match best {
            Some(detected) => self.normalized(detected),
            None => Self::heuristic_guess(text),
        }
    }

    fn normalized(&self, detected: DetectedLanguage) -> DetectedLanguage {
        match normalize_language_code(&detected.language) {
            Ok(code) => DetectedLanguage {
                language: code,
                confidence: detected.confidence,
            },
            Err(_) => detected,
        }
    }

    /// Unicode script-range guess, used when no provider has an opinion
    fn heuristic_guess(text: &str) -> DetectedLanguage {
        let mut guess = "en";
        for ch in text.chars() {
            let code = ch as u32;
            guess = match code {
                0x3040..=0x30FF => "ja",
                0xAC00..=0xD7AF => "ko",
                0x4E00..=0x9FFF => "zh",
                0x0400..=0x04FF => "ru",
                0x0600..=0x06FF => "ar",
                0x0590..=0x05FF => "he",
                _ => continue,
            };
            break;
        }
        DetectedLanguage {
            language: guess.to_string(),
            confidence: HEURISTIC_CONFIDENCE,
        }
    }
}
