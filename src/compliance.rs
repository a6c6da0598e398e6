/*!
 * Compliance gateway for request/provider admission.
 *
 * Every candidate provider is evaluated against the tenant's compliance
 * policy before the router is allowed to invoke it. Four rule families run
 * independently and all must pass:
 *
 * - Region: the provider's region tags must intersect the required list, or
 *   an explicit fallback list.
 * - Certification: the provider's certifications must be a superset of the
 *   required ones.
 * - Banned phrases: case-insensitive substring scan.
 * - PII: regex scan for emails, phone numbers and credit-card-like numbers,
 *   extensible with policy-supplied patterns.
 *
 * PII findings are only region-sensitive: text containing PII may not be
 * routed to a provider that satisfies the region requirement via the
 * fallback list alone. Banned-phrase findings deliberately do not get the
 * same strict/fallback distinction.
 */

use anyhow::{Context, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::RouteError;
use crate::providers::ProviderSpec;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\d[\d\s().-]{7,}\d").unwrap());

static CREDIT_CARD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){13,16}\b").unwrap());

/// A single PII finding: the kind of pattern that matched and the span
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PiiFinding {
    /// Pattern kind ("email", "phone", "credit_card", or a custom name)
    pub kind: String,
    /// The matched text
    pub matched: String,
}

/// A policy-supplied PII pattern beyond the built-in set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPiiPattern {
    /// Name reported in findings
    pub name: String,
    /// Regex source
    pub pattern: String,
}

/// The compliance rules a provider/text pair must satisfy
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompliancePolicy {
    /// Region tags at least one of which a provider must carry
    #[serde(default)]
    pub required_region_tags: Vec<String>,

    /// Region tags accepted as a fallback when no required tag matches
    #[serde(default)]
    pub fallback_region_tags: Vec<String>,

    /// Certifications a provider must carry, all of them
    #[serde(default)]
    pub required_certifications: Vec<String>,

    /// Phrases that block routing wherever they appear in the text
    #[serde(default)]
    pub banned_phrases: Vec<String>,

    /// Additional PII patterns on top of the built-in email/phone/card set
    #[serde(default)]
    pub custom_pii_patterns: Vec<CustomPiiPattern>,
}

/// Result of evaluating one request/provider pair.
///
/// Computed fresh for every pair and never persisted.
#[derive(Debug, Clone, Default)]
pub struct ComplianceEvaluation {
    /// Deduplicated PII findings in the request text
    pub pii_findings: Vec<PiiFinding>,

    /// Banned phrases found in the text
    pub banned_matches: Vec<String>,

    /// Region tags of the evaluated provider at evaluation time
    pub provider_regions: Vec<String>,

    /// Certifications of the evaluated provider at evaluation time
    pub provider_certifications: Vec<String>,

    /// Whether the provider carries a required (non-fallback) region tag
    pub strict_region: bool,

    /// Conjunction of all rule outcomes
    pub allowed: bool,

    /// Human-readable violation descriptions, in rule order
    pub violations: Vec<String>,
}

impl ComplianceEvaluation {
    /// One-line summary of the violations for error display
    pub fn violation_summary(&self) -> String {
        if self.violations.is_empty() {
            "no violations".to_string()
        } else {
            self.violations.join("; ")
        }
    }

    /// Fold several per-provider evaluations into one aggregate, used when
    /// every provider in the chain was blocked by policy.
    pub fn aggregate(evaluations: Vec<ComplianceEvaluation>) -> Self {
        let mut merged = ComplianceEvaluation {
            allowed: false,
            ..Default::default()
        };
        for eval in evaluations {
            for finding in eval.pii_findings {
                if !merged.pii_findings.contains(&finding) {
                    merged.pii_findings.push(finding);
                }
            }
            for phrase in eval.banned_matches {
                if !merged.banned_matches.contains(&phrase) {
                    merged.banned_matches.push(phrase);
                }
            }
            for violation in eval.violations {
                if !merged.violations.contains(&violation) {
                    merged.violations.push(violation);
                }
            }
        }
        merged
    }
}

/// Evaluates request/provider pairs against a [`CompliancePolicy`]
pub struct ComplianceGateway {
    policy: CompliancePolicy,
    custom_patterns: Vec<(String, Regex)>,
}

impl ComplianceGateway {
    /// Create a gateway, compiling any policy-supplied PII patterns
    pub fn new(policy: CompliancePolicy) -> Result<Self> {
        let mut custom_patterns = Vec::with_capacity(policy.custom_pii_patterns.len());
        for custom in &policy.custom_pii_patterns {
            let regex = Regex::new(&custom.pattern)
                .with_context(|| format!("Invalid PII pattern '{}'", custom.name))?;
            custom_patterns.push((custom.name.clone(), regex));
        }

        Ok(Self {
            policy,
            custom_patterns,
        })
    }

    /// Gateway with an empty policy; everything passes
    pub fn permissive() -> Self {
        Self {
            policy: CompliancePolicy::default(),
            custom_patterns: Vec::new(),
        }
    }

    pub fn policy(&self) -> &CompliancePolicy {
        &self.policy
    }

    /// Evaluate a request/provider pair. Never fails; the outcome is carried
    /// entirely in the returned evaluation.
    pub fn evaluate(
        &self,
        text: &str,
        provider: &ProviderSpec,
        target_language: &str,
    ) -> ComplianceEvaluation {
        let mut eval = ComplianceEvaluation {
            pii_findings: self.scan_pii(text),
            banned_matches: self.scan_banned(text),
            provider_regions: provider.region_tags.clone(),
            provider_certifications: provider.certification_tags.clone(),
            strict_region: false,
            allowed: true,
            violations: Vec::new(),
        };

        // Region rule
        let required = &self.policy.required_region_tags;
        eval.strict_region = required.is_empty()
            || provider
                .region_tags
                .iter()
                .any(|tag| required.contains(tag));
        let fallback_region = provider
            .region_tags
            .iter()
            .any(|tag| self.policy.fallback_region_tags.contains(tag));

        if !required.is_empty() && !eval.strict_region && !fallback_region {
            eval.violations.push(format!(
                "Provider '{}' serves no required or fallback region (required: {})",
                provider.id,
                required.join(", ")
            ));
        }

        // Certification rule: required set must be a subset of the provider's
        for cert in &self.policy.required_certifications {
            if !provider.certification_tags.contains(cert) {
                eval.violations.push(format!(
                    "Provider '{}' lacks required certification '{}'",
                    provider.id, cert
                ));
            }
        }

        // Banned phrases block regardless of region standing
        for phrase in &eval.banned_matches {
            eval.violations
                .push(format!("Text contains banned phrase '{}'", phrase));
        }

        // PII is allowed only with strict region membership once a
        // required-region policy exists. The same leniency is not extended
        // when the provider qualifies through the fallback list.
        if !eval.pii_findings.is_empty() && !required.is_empty() && !eval.strict_region {
            let kinds: Vec<&str> = eval
                .pii_findings
                .iter()
                .map(|f| f.kind.as_str())
                .collect();
            let standing = if fallback_region {
                "is only fallback-region compliant"
            } else {
                "serves no required region"
            };
            eval.violations.push(format!(
                "Text contains PII ({}) and provider '{}' {}",
                kinds.join(", "),
                provider.id,
                standing
            ));
        }

        eval.allowed = eval.violations.is_empty();

        if !eval.allowed {
            debug!(
                "Compliance blocked provider '{}' for target '{}': {}",
                provider.id,
                target_language,
                eval.violation_summary()
            );
        }

        eval
    }

    /// Evaluate and fail with [`RouteError::ComplianceBlocked`] when the
    /// request may not be routed to the provider.
    pub fn assert_can_route(
        &self,
        text: &str,
        provider: &ProviderSpec,
        target_language: &str,
    ) -> Result<ComplianceEvaluation, RouteError> {
        let eval = self.evaluate(text, provider, target_language);
        if eval.allowed {
            Ok(eval)
        } else {
            Err(RouteError::ComplianceBlocked(eval))
        }
    }

    fn scan_pii(&self, text: &str) -> Vec<PiiFinding> {
        let mut findings = Vec::new();

        let built_in: [(&str, &Regex); 3] = [
            ("email", &EMAIL_PATTERN),
            ("phone", &PHONE_PATTERN),
            ("credit_card", &CREDIT_CARD_PATTERN),
        ];

        for (kind, pattern) in built_in {
            for matched in pattern.find_iter(text) {
                let finding = PiiFinding {
                    kind: kind.to_string(),
                    matched: matched.as_str().to_string(),
                };
                if !findings.contains(&finding) {
                    findings.push(finding);
                }
            }
        }

        for (name, pattern) in &self.custom_patterns {
            for matched in pattern.find_iter(text) {
                let finding = PiiFinding {
                    kind: name.clone(),
                    matched: matched.as_str().to_string(),
                };
                if !findings.contains(&finding) {
                    findings.push(finding);
                }
            }
        }

        findings
    }

    fn scan_banned(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.policy
            .banned_phrases
            .iter()
            .filter(|phrase| !phrase.is_empty() && lowered.contains(&phrase.to_lowercase()))
            .cloned()
            .collect()
    }
}
