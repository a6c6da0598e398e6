/*!
 * Tests for the compliance gateway
 */

use polyroute::compliance::{ComplianceGateway, CompliancePolicy, CustomPiiPattern};
use polyroute::providers::ProviderSpec;

fn provider_in(regions: &[&str]) -> ProviderSpec {
    ProviderSpec::new("p", 0.0001).with_regions(regions.iter().map(|r| r.to_string()).collect())
}

fn gateway(policy: CompliancePolicy) -> ComplianceGateway {
    ComplianceGateway::new(policy).unwrap()
}

/// The permissive gateway admits everything
#[test]
fn test_evaluate_permissiveGateway_shouldAllow() {
    let gateway = ComplianceGateway::permissive();
    let eval = gateway.evaluate(
        "write to alice@example.com about the offer",
        &provider_in(&[]),
        "fr",
    );
    assert!(eval.allowed);
}

/// A provider in a required region may process text containing PII
#[test]
fn test_evaluate_piiWithStrictRegion_shouldAllow() {
    let gw = gateway(CompliancePolicy {
        required_region_tags: vec!["eu".to_string()],
        fallback_region_tags: vec!["us".to_string()],
        ..Default::default()
    });

    let eval = gw.evaluate("contact alice@example.com", &provider_in(&["eu"]), "fr");
    assert!(eval.allowed);
    assert!(eval.strict_region);
    assert!(!eval.pii_findings.is_empty());
}

/// The same PII is blocked when only a fallback region matches
#[test]
fn test_evaluate_piiWithFallbackRegion_shouldBlock() {
    let gw = gateway(CompliancePolicy {
        required_region_tags: vec!["eu".to_string()],
        fallback_region_tags: vec!["us".to_string()],
        ..Default::default()
    });

    let eval = gw.evaluate("contact alice@example.com", &provider_in(&["us"]), "fr");
    assert!(!eval.allowed);
    assert!(!eval.strict_region);
}

/// Banned phrases block regardless of the provider's region standing
#[test]
fn test_evaluate_bannedPhraseInStrictRegion_shouldStillBlock() {
    let gw = gateway(CompliancePolicy {
        required_region_tags: vec!["eu".to_string()],
        banned_phrases: vec!["project neptune".to_string()],
        ..Default::default()
    });

    let eval = gw.evaluate(
        "status of Project Neptune is green",
        &provider_in(&["eu"]),
        "fr",
    );
    assert!(!eval.allowed);
    assert_eq!(eval.banned_matches, vec!["project neptune".to_string()]);
}

/// A provider in neither the required nor the fallback set is blocked outright
#[test]
fn test_evaluate_providerOutsideAllRegions_shouldBlock() {
    let gw = gateway(CompliancePolicy {
        required_region_tags: vec!["eu".to_string()],
        fallback_region_tags: vec!["us".to_string()],
        ..Default::default()
    });

    let eval = gw.evaluate("plain text", &provider_in(&["apac"]), "fr");
    assert!(!eval.allowed);
}

/// Certification checks require every listed certification
#[test]
fn test_evaluate_missingCertification_shouldBlock() {
    let gw = gateway(CompliancePolicy {
        required_certifications: vec!["iso27001".to_string(), "soc2".to_string()],
        ..Default::default()
    });

    let certified = ProviderSpec::new("p", 0.0001)
        .with_certifications(vec!["iso27001".to_string(), "soc2".to_string()]);
    let partial =
        ProviderSpec::new("q", 0.0001).with_certifications(vec!["iso27001".to_string()]);

    assert!(gw.evaluate("plain text", &certified, "fr").allowed);
    assert!(!gw.evaluate("plain text", &partial, "fr").allowed);
}

/// Custom PII patterns are compiled at construction and reported by name
#[test]
fn test_evaluate_customPiiPattern_shouldReportFindings() {
    let gw = gateway(CompliancePolicy {
        required_region_tags: vec!["eu".to_string()],
        custom_pii_patterns: vec![CustomPiiPattern {
            name: "employee_id".to_string(),
            pattern: r"\bEMP-\d{6}\b".to_string(),
        }],
        ..Default::default()
    });

    let eval = gw.evaluate("please look up EMP-123456", &provider_in(&["us"]), "fr");
    assert!(!eval.allowed);
    assert!(eval.pii_findings.iter().any(|f| f.kind == "employee_id"));
}

/// An unparseable custom pattern fails construction, not evaluation
#[test]
fn test_new_invalidCustomPattern_shouldFail() {
    let result = ComplianceGateway::new(CompliancePolicy {
        custom_pii_patterns: vec![CustomPiiPattern {
            name: "broken".to_string(),
            pattern: "([unclosed".to_string(),
        }],
        ..Default::default()
    });
    assert!(result.is_err());
}
