use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::compliance::CompliancePolicy;

/// Application configuration module
/// This module handles the routing configuration including loading,
/// validating and saving configuration settings.
/// Represents the full routing configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Provider entries, in failover priority order
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,

    /// Budget settings
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Compliance policy applied to every request
    #[serde(default)]
    pub compliance: CompliancePolicy,

    /// Router settings
    #[serde(default)]
    pub router: RouterConfig,

    /// Offline draft replay settings
    #[serde(default)]
    pub replay: ReplayConfigEntry,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// One configured translation backend
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderEntry {
    /// Provider identifier, unique within the chain
    pub id: String,

    /// Model name
    #[serde(default = "String::new")]
    pub model: String,

    /// API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL; empty means the provider's public endpoint
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Cost per character, in USD
    #[serde(default = "default_cost_per_char_usd")]
    pub cost_per_char_usd: f64,

    /// Per-attempt latency budget in milliseconds
    #[serde(default = "default_target_latency_ms")]
    pub target_latency_ms: u64,

    /// Historical success rate, 0.0 to 1.0
    #[serde(default = "default_reliability")]
    pub reliability: f64,

    /// Regions this provider is certified to process data in
    #[serde(default)]
    pub data_residency_regions: Vec<String>,

    /// Compliance certifications held by the provider
    #[serde(default)]
    pub certifications: Vec<String>,
}

/// Daily spend settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BudgetConfig {
    /// Daily spend ceiling in USD
    #[serde(default = "default_daily_ceiling_usd")]
    pub daily_ceiling_usd: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_ceiling_usd: default_daily_ceiling_usd(),
        }
    }
}

/// Router and pipeline limits
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RouterConfig {
    /// Per-provider retry budget for transient failures
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff between provider retries, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Maximum translatable text length in characters
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,

    /// Minimum detector confidence before falling back to heuristics
    #[serde(default = "default_min_detection_confidence")]
    pub min_detection_confidence: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_text_length: default_max_text_length(),
            min_detection_confidence: default_min_detection_confidence(),
        }
    }
}

/// Offline draft replay settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReplayConfigEntry {
    /// Seconds between replay cycles
    #[serde(default = "default_replay_interval_secs")]
    pub interval_secs: u64,

    /// Attempt ceiling before a draft is marked failed
    #[serde(default = "default_replay_max_attempts")]
    pub max_attempts: u32,

    /// Maximum stored drafts per user
    #[serde(default = "default_max_drafts_per_user")]
    pub max_drafts_per_user: usize,

    /// Hours a draft is retained before pruning
    #[serde(default = "default_draft_retention_hours")]
    pub draft_retention_hours: i64,
}

impl Default for ReplayConfigEntry {
    fn default() -> Self {
        Self {
            interval_secs: default_replay_interval_secs(),
            max_attempts: default_replay_max_attempts(),
            max_drafts_per_user: default_max_drafts_per_user(),
            draft_retention_hours: default_draft_retention_hours(),
        }
    }
}

/// Log level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_cost_per_char_usd() -> f64 {
    0.00002
}

fn default_target_latency_ms() -> u64 {
    5000
}

fn default_reliability() -> f64 {
    0.9
}

fn default_daily_ceiling_usd() -> f64 {
    10.0
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_max_text_length() -> usize {
    5000
}

fn default_min_detection_confidence() -> f64 {
    0.7
}

fn default_replay_interval_secs() -> u64 {
    30
}

fn default_replay_max_attempts() -> u32 {
    5
}

fn default_max_drafts_per_user() -> usize {
    50
}

fn default_draft_retention_hours() -> i64 {
    72
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or fall back to defaults if missing
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.budget.daily_ceiling_usd < 0.0 {
            return Err(anyhow!("Daily budget ceiling must not be negative"));
        }
        if self.router.max_text_length == 0 {
            return Err(anyhow!("Maximum text length must be positive"));
        }
        if !(0.0..=1.0).contains(&self.router.min_detection_confidence) {
            return Err(anyhow!(
                "Minimum detection confidence must be between 0.0 and 1.0"
            ));
        }
        if self.replay.max_attempts == 0 {
            return Err(anyhow!("Replay attempt ceiling must be positive"));
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(anyhow!("Provider entries must have a non-empty id"));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(anyhow!("Duplicate provider id: {}", provider.id));
            }
            if provider.cost_per_char_usd < 0.0 {
                return Err(anyhow!(
                    "Provider {} has a negative per-character cost",
                    provider.id
                ));
            }
            if !(0.0..=1.0).contains(&provider.reliability) {
                return Err(anyhow!(
                    "Provider {} reliability must be between 0.0 and 1.0",
                    provider.id
                ));
            }
        }
        Ok(())
    }
}

impl ProviderEntry {
    /// Build the routing spec for this entry
    pub fn to_spec(&self) -> crate::providers::ProviderSpec {
        crate::providers::ProviderSpec::new(&self.id, self.cost_per_char_usd)
            .with_target_latency_ms(self.target_latency_ms)
            .with_reliability(self.reliability)
            .with_regions(self.data_residency_regions.clone())
            .with_certifications(self.certifications.clone())
    }
}
