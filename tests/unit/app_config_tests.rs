/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use polyroute::app_config::{Config, LogLevel};

/// Full JSON configuration parses and validates
#[test]
fn test_config_fromJson_shouldParseAllSections() -> Result<()> {
    let json = r#"{
        "providers": [
            {
                "id": "primary",
                "model": "gpt-4o-mini",
                "endpoint": "https://eu.example.com",
                "cost_per_char_usd": 0.00003,
                "target_latency_ms": 2000,
                "reliability": 0.98,
                "data_residency_regions": ["eu"],
                "certifications": ["iso27001"]
            },
            {
                "id": "fallback",
                "model": "gpt-3.5-turbo"
            }
        ],
        "budget": { "daily_ceiling_usd": 25.0 },
        "compliance": {
            "required_region_tags": ["eu"],
            "banned_phrases": ["codename osprey"]
        },
        "router": { "retry_count": 3, "max_text_length": 2000 },
        "replay": { "interval_secs": 10, "max_attempts": 3 },
        "log_level": "debug"
    }"#;

    let config: Config = serde_json::from_str(json)?;
    config.validate()?;

    assert_eq!(config.providers.len(), 2);
    assert_eq!(config.providers[0].target_latency_ms, 2000);
    // Unspecified fields fall back to defaults.
    assert_eq!(config.providers[1].target_latency_ms, 5000);
    assert_eq!(config.budget.daily_ceiling_usd, 25.0);
    assert_eq!(config.compliance.required_region_tags, vec!["eu"]);
    assert_eq!(config.router.retry_count, 3);
    assert_eq!(config.replay.max_attempts, 3);
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

/// An empty JSON object yields the default configuration
#[test]
fn test_config_fromEmptyJson_shouldUseDefaults() -> Result<()> {
    let config: Config = serde_json::from_str("{}")?;
    assert!(config.providers.is_empty());
    assert_eq!(config.router.max_text_length, 5000);
    assert_eq!(config.replay.interval_secs, 30);
    assert_eq!(config.log_level, LogLevel::Info);
    Ok(())
}

/// Loading a malformed file reports a parse error
#[test]
fn test_config_fromFile_malformedJson_shouldFail() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json")?;

    assert!(Config::from_file(&path).is_err());
    Ok(())
}

/// Saved configuration round-trips through from_file
#[test]
fn test_config_saveThenLoad_shouldRoundTrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");

    let mut config = Config::default();
    config.budget.daily_ceiling_usd = 3.5;
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.budget.daily_ceiling_usd, 3.5);
    Ok(())
}

/// A provider entry with an out-of-range reliability fails validation on load
#[test]
fn test_config_fromFile_invalidEntry_shouldFailValidation() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "providers": [{ "id": "p", "reliability": 2.0 }] }"#,
    )?;

    assert!(Config::from_file(&path).is_err());
    Ok(())
}
