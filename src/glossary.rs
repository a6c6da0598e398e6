/*!
 * Three-tier glossary resolution for terminology consistency.
 *
 * Entries live at one of three scope tiers (user > channel > tenant). Lookup
 * is case-insensitive and walks the tiers in precedence order; the first
 * entry whose channel allow-list admits the caller wins. When different
 * tiers disagree on the target for the same source term the disagreement is
 * surfaced as a conflict for the caller to resolve, never silently decided.
 */

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}_']+").unwrap());

/// Precedence tier an entry belongs to. Lower priority value wins.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum GlossaryScope {
    /// Personal overrides, highest precedence
    User,
    /// Channel conventions
    Channel,
    /// Organization-wide terminology, lowest precedence
    Tenant,
}

impl GlossaryScope {
    /// Numeric priority for candidate ranking; lower is more specific
    pub fn priority(&self) -> u8 {
        match self {
            Self::User => 0,
            Self::Channel => 1,
            Self::Tenant => 2,
        }
    }
}

/// How a matched term is rendered into the output text
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GlossaryStrategy {
    /// Substitute the bare target
    #[default]
    Replace,
    /// Leave the original token unchanged
    Retain,
    /// Render `target (original)`
    Mixed,
}

/// A glossary entry at a given scope tier
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GlossaryEntry {
    /// Source term, matched case-insensitively against whole tokens
    pub source_term: String,

    /// Replacement term
    pub target_term: String,

    /// Precedence tier
    pub scope: GlossaryScope,

    /// Rendering strategy
    #[serde(default)]
    pub strategy: GlossaryStrategy,

    /// When present, the entry only applies in these channels
    #[serde(default)]
    pub allowed_channels: Option<Vec<String>>,
}

impl GlossaryEntry {
    pub fn new(
        source_term: impl Into<String>,
        target_term: impl Into<String>,
        scope: GlossaryScope,
    ) -> Self {
        Self {
            source_term: source_term.into(),
            target_term: target_term.into(),
            scope,
            strategy: GlossaryStrategy::Replace,
            allowed_channels: None,
        }
    }

    pub fn with_strategy(mut self, strategy: GlossaryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_allowed_channels(mut self, channels: Vec<String>) -> Self {
        self.allowed_channels = Some(channels);
        self
    }

    fn admits_channel(&self, channel_id: Option<&str>) -> bool {
        match (&self.allowed_channels, channel_id) {
            (None, _) => true,
            (Some(allowed), Some(channel)) => allowed.iter().any(|c| c == channel),
            (Some(_), None) => false,
        }
    }
}

/// Caller-side context for a glossary lookup
#[derive(Debug, Clone, Default)]
pub struct GlossaryContext {
    /// Channel the request originated from, checked against allow-lists
    pub channel_id: Option<String>,
}

impl GlossaryContext {
    pub fn for_channel(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
        }
    }
}

/// Caller decision for one conflicted term
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TermResolution {
    /// No decision supplied yet
    #[default]
    Unspecified,
    /// Use the top-ranked candidate
    UsePreferred,
    /// Use the next candidate after the preferred one
    UseAlternative,
    /// Keep the original token, no substitution
    KeepOriginal,
}

/// One candidate target offered for a term
#[derive(Debug, Clone, PartialEq)]
pub struct GlossaryCandidate {
    pub target_term: String,
    pub scope: GlossaryScope,
    pub strategy: GlossaryStrategy,
}

/// Per-term record of the glossary application
#[derive(Debug, Clone)]
pub struct GlossaryMatch {
    /// Source term as it appeared in the text
    pub source_term: String,

    /// True when more than one distinct target was offered across scopes
    pub has_conflict: bool,

    /// Candidates ranked by scope priority then target name
    pub candidates: Vec<GlossaryCandidate>,

    /// Target actually substituted, if any
    pub applied_target: Option<String>,

    /// Decision that was applied
    pub resolution: TermResolution,
}

/// Outcome of a request-facing glossary application
#[derive(Debug, Clone)]
pub struct GlossaryApplicationResult {
    /// Text after substitution of all resolvable terms
    pub text: String,

    /// Per-term records, one per distinct matched term
    pub matches: Vec<GlossaryMatch>,

    /// True iff some match has a conflict without a supplied decision
    pub requires_resolution: bool,
}

impl GlossaryApplicationResult {
    pub fn has_conflicts(&self) -> bool {
        self.matches.iter().any(|m| m.has_conflict)
    }

    /// Terms still waiting on a caller decision
    pub fn unresolved_terms(&self) -> Vec<&str> {
        self.matches
            .iter()
            .filter(|m| m.has_conflict && m.resolution == TermResolution::Unspecified)
            .map(|m| m.source_term.as_str())
            .collect()
    }
}

/// Shared glossary store and term substitution engine.
///
/// Entries are keyed by lowercased source term. The store is shared across
/// concurrent requests, so reads and writes go through an RwLock.
#[derive(Default)]
pub struct GlossaryResolver {
    entries: RwLock<HashMap<String, Vec<GlossaryEntry>>>,
}

impl GlossaryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; later additions at the same scope shadow earlier ones
    /// only through candidate ranking, nothing is overwritten.
    pub fn add_entry(&self, entry: GlossaryEntry) {
        let key = entry.source_term.to_lowercase();
        self.entries.write().entry(key).or_default().push(entry);
    }

    pub fn add_entries(&self, entries: impl IntoIterator<Item = GlossaryEntry>) {
        for entry in entries {
            self.add_entry(entry);
        }
    }

    /// Remove all entries for a source term
    pub fn remove_term(&self, source_term: &str) {
        self.entries.write().remove(&source_term.to_lowercase());
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn term_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Plain substitution pass: every token takes the most specific
    /// channel-admissible entry, rendered with the entry's strategy.
    /// Conflicts are not reported; precedence decides.
    pub fn resolve(&self, text: &str, ctx: &GlossaryContext) -> String {
        let entries = self.entries.read();
        WORD_PATTERN
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let token = &caps[0];
                match Self::best_entry(&entries, token, ctx) {
                    Some(entry) => Self::render(entry.strategy, &entry.target_term, token),
                    None => token.to_string(),
                }
            })
            .into_owned()
    }

    /// Request-facing application with conflict detection.
    ///
    /// A term has a conflict when the admissible entries across scopes offer
    /// more than one distinct target. Conflicted terms are only substituted
    /// once the caller has supplied a decision; until then the original token
    /// stays in place and `requires_resolution` is set.
    pub fn apply(
        &self,
        text: &str,
        ctx: &GlossaryContext,
        decisions: &HashMap<String, TermResolution>,
    ) -> GlossaryApplicationResult {
        let entries = self.entries.read();
        let mut matches: Vec<GlossaryMatch> = Vec::new();
        let mut requires_resolution = false;

        let output = WORD_PATTERN
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let token = &caps[0];
                let key = token.to_lowercase();

                let candidates = Self::ranked_candidates(&entries, &key, ctx);
                if candidates.is_empty() {
                    return token.to_string();
                }

                let distinct_targets = {
                    let mut targets: Vec<&str> =
                        candidates.iter().map(|c| c.target_term.as_str()).collect();
                    targets.dedup();
                    targets.len()
                };
                let has_conflict = distinct_targets > 1;

                let resolution = decisions
                    .get(&key)
                    .copied()
                    .unwrap_or(TermResolution::Unspecified);

                let (rendered, applied_target) = if !has_conflict {
                    let top = &candidates[0];
                    (
                        Self::render(top.strategy, &top.target_term, token),
                        Some(top.target_term.clone()),
                    )
                } else {
                    match resolution {
                        TermResolution::UsePreferred => {
                            let top = &candidates[0];
                            (
                                Self::render(top.strategy, &top.target_term, token),
                                Some(top.target_term.clone()),
                            )
                        }
                        TermResolution::UseAlternative => {
                            // Next candidate with a target different from the top
                            let preferred = &candidates[0].target_term;
                            let alt = candidates
                                .iter()
                                .find(|c| &c.target_term != preferred)
                                .unwrap_or(&candidates[0]);
                            (
                                Self::render(alt.strategy, &alt.target_term, token),
                                Some(alt.target_term.clone()),
                            )
                        }
                        TermResolution::KeepOriginal => (token.to_string(), None),
                        TermResolution::Unspecified => {
                            requires_resolution = true;
                            (token.to_string(), None)
                        }
                    }
                };

                if !matches.iter().any(|m: &GlossaryMatch| {
                    m.source_term.to_lowercase() == key
                }) {
                    matches.push(GlossaryMatch {
                        source_term: token.to_string(),
                        has_conflict,
                        candidates: candidates.clone(),
                        applied_target,
                        resolution,
                    });
                }

                rendered
            })
            .into_owned();

        GlossaryApplicationResult {
            text: output,
            matches,
            requires_resolution,
        }
    }

    /// Most specific channel-admissible entry for a token, tier by tier
    fn best_entry<'a>(
        entries: &'a HashMap<String, Vec<GlossaryEntry>>,
        token: &str,
        ctx: &GlossaryContext,
    ) -> Option<&'a GlossaryEntry> {
        let candidates = entries.get(&token.to_lowercase())?;
        for scope in [
            GlossaryScope::User,
            GlossaryScope::Channel,
            GlossaryScope::Tenant,
        ] {
            if let Some(entry) = candidates
                .iter()
                .find(|e| e.scope == scope && e.admits_channel(ctx.channel_id.as_deref()))
            {
                return Some(entry);
            }
        }
        None
    }

    /// All admissible candidates for a key, ranked by scope priority then
    /// target name so ties break stably.
    fn ranked_candidates(
        entries: &HashMap<String, Vec<GlossaryEntry>>,
        key: &str,
        ctx: &GlossaryContext,
    ) -> Vec<GlossaryCandidate> {
        let Some(found) = entries.get(key) else {
            return Vec::new();
        };

        let mut candidates: Vec<GlossaryCandidate> = found
            .iter()
            .filter(|e| e.admits_channel(ctx.channel_id.as_deref()))
            .map(|e| GlossaryCandidate {
                target_term: e.target_term.clone(),
                scope: e.scope,
                strategy: e.strategy,
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.scope
                .priority()
                .cmp(&b.scope.priority())
                .then_with(|| a.target_term.cmp(&b.target_term))
        });
        candidates.dedup();
        candidates
    }

    fn render(strategy: GlossaryStrategy, target: &str, original: &str) -> String {
        match strategy {
            GlossaryStrategy::Replace => target.to_string(),
            GlossaryStrategy::Retain => original.to_string(),
            GlossaryStrategy::Mixed => format!("{} ({})", target, original),
        }
    }
}
