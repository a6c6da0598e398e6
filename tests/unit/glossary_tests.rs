/*!
 * Tests for glossary resolution and conflict handling
 */

use std::collections::HashMap;

use polyroute::glossary::{
    GlossaryContext, GlossaryEntry, GlossaryResolver, GlossaryScope, GlossaryStrategy,
    TermResolution,
};

fn resolver_with(entries: Vec<GlossaryEntry>) -> GlossaryResolver {
    let resolver = GlossaryResolver::new();
    for entry in entries {
        resolver.add_entry(entry);
    }
    resolver
}

fn no_decisions() -> HashMap<String, TermResolution> {
    HashMap::new()
}

/// A single-scope entry is substituted without conflict
#[test]
fn test_apply_singleEntry_shouldSubstitute() {
    let resolver = resolver_with(vec![GlossaryEntry::new(
        "CPU",
        "中央处理器",
        GlossaryScope::Tenant,
    )]);

    let result = resolver.apply(
        "CPU usage is high",
        &GlossaryContext::default(),
        &no_decisions(),
    );
    assert_eq!(result.text, "中央处理器 usage is high");
    assert!(!result.requires_resolution);
    assert!(!result.matches[0].has_conflict);
}

/// Matching is case-insensitive on the source term
#[test]
fn test_apply_caseInsensitiveTerm_shouldSubstitute() {
    let resolver = resolver_with(vec![GlossaryEntry::new(
        "cpu",
        "processor",
        GlossaryScope::Tenant,
    )]);

    let result = resolver.apply("CPU and Cpu", &GlossaryContext::default(), &no_decisions());
    assert_eq!(result.text, "processor and processor");
}

/// Identical targets across scopes are not a conflict
#[test]
fn test_apply_sameTargetAcrossScopes_shouldNotConflict() {
    let resolver = resolver_with(vec![
        GlossaryEntry::new("db", "database", GlossaryScope::Tenant),
        GlossaryEntry::new("db", "database", GlossaryScope::User),
    ]);

    let result = resolver.apply("the db", &GlossaryContext::default(), &no_decisions());
    assert!(!result.matches[0].has_conflict);
    assert_eq!(result.text, "the database");
}

/// Distinct targets across scopes conflict; without a decision the original
/// token stays and resolution is required
#[test]
fn test_apply_conflictWithoutDecision_shouldKeepOriginal() {
    let resolver = resolver_with(vec![
        GlossaryEntry::new("db", "database", GlossaryScope::Tenant),
        GlossaryEntry::new("db", "data bank", GlossaryScope::User),
    ]);

    let result = resolver.apply("the db", &GlossaryContext::default(), &no_decisions());
    assert!(result.requires_resolution);
    assert_eq!(result.text, "the db");
    assert_eq!(result.unresolved_terms(), vec!["db"]);
}

/// UsePreferred picks the highest-priority scope's target
#[test]
fn test_apply_usePreferredDecision_shouldPickHighestScope() {
    let resolver = resolver_with(vec![
        GlossaryEntry::new("db", "database", GlossaryScope::Tenant),
        GlossaryEntry::new("db", "data bank", GlossaryScope::User),
    ]);

    let mut decisions = HashMap::new();
    decisions.insert("db".to_string(), TermResolution::UsePreferred);

    let result = resolver.apply("the db", &GlossaryContext::default(), &decisions);
    // User scope outranks tenant scope.
    assert_eq!(result.text, "the data bank");
    assert!(!result.requires_resolution);
}

/// UseAlternative picks the next distinct target after the preferred one
#[test]
fn test_apply_useAlternativeDecision_shouldPickNextDistinctTarget() {
    let resolver = resolver_with(vec![
        GlossaryEntry::new("db", "database", GlossaryScope::Tenant),
        GlossaryEntry::new("db", "data bank", GlossaryScope::User),
    ]);

    let mut decisions = HashMap::new();
    decisions.insert("db".to_string(), TermResolution::UseAlternative);

    let result = resolver.apply("the db", &GlossaryContext::default(), &decisions);
    assert_eq!(result.text, "the database");
}

/// KeepOriginal resolves the conflict while leaving the token untouched
#[test]
fn test_apply_keepOriginalDecision_shouldResolveWithoutSubstitution() {
    let resolver = resolver_with(vec![
        GlossaryEntry::new("db", "database", GlossaryScope::Tenant),
        GlossaryEntry::new("db", "data bank", GlossaryScope::User),
    ]);

    let mut decisions = HashMap::new();
    decisions.insert("db".to_string(), TermResolution::KeepOriginal);

    let result = resolver.apply("the db", &GlossaryContext::default(), &decisions);
    assert_eq!(result.text, "the db");
    assert!(!result.requires_resolution);
}

/// Channel-restricted entries are invisible outside their allow-list
#[test]
fn test_apply_channelRestrictedEntry_shouldRespectAllowList() {
    let resolver = resolver_with(vec![
        GlossaryEntry::new("ping", "latency check", GlossaryScope::Channel)
            .with_allowed_channels(vec!["ops".to_string()]),
    ]);

    let in_channel = resolver.apply(
        "run a ping",
        &GlossaryContext::for_channel("ops"),
        &no_decisions(),
    );
    assert_eq!(in_channel.text, "run a latency check");

    let other_channel = resolver.apply(
        "run a ping",
        &GlossaryContext::for_channel("general"),
        &no_decisions(),
    );
    assert_eq!(other_channel.text, "run a ping");

    // No channel on the request also means denied.
    let no_channel = resolver.apply("run a ping", &GlossaryContext::default(), &no_decisions());
    assert_eq!(no_channel.text, "run a ping");
}

/// Substitution is idempotent: re-applying over already-substituted text
/// changes nothing
#[test]
fn test_apply_twice_shouldBeIdempotent() {
    let resolver = resolver_with(vec![GlossaryEntry::new(
        "CPU",
        "processor",
        GlossaryScope::Tenant,
    )]);

    let once = resolver.apply(
        "CPU usage is high",
        &GlossaryContext::default(),
        &no_decisions(),
    );
    let twice = resolver.apply(&once.text, &GlossaryContext::default(), &no_decisions());
    assert_eq!(once.text, twice.text);
}

/// The Mixed strategy renders the target with the original in parentheses
#[test]
fn test_apply_mixedStrategy_shouldRenderBothForms() {
    let resolver = resolver_with(vec![
        GlossaryEntry::new("SLA", "service agreement", GlossaryScope::Tenant)
            .with_strategy(GlossaryStrategy::Mixed),
    ]);

    let result = resolver.apply("per the SLA", &GlossaryContext::default(), &no_decisions());
    assert_eq!(result.text, "per the service agreement (SLA)");
}

/// The Retain strategy records the match but leaves the text unchanged
#[test]
fn test_apply_retainStrategy_shouldLeaveTextUnchanged() {
    let resolver = resolver_with(vec![
        GlossaryEntry::new("SLA", "service agreement", GlossaryScope::Tenant)
            .with_strategy(GlossaryStrategy::Retain),
    ]);

    let result = resolver.apply("per the SLA", &GlossaryContext::default(), &no_decisions());
    assert_eq!(result.text, "per the SLA");
    assert_eq!(result.matches.len(), 1);
}
