/*!
 * Offline draft persistence and replay.
 *
 * Drafts are translation requests captured while the caller was offline.
 * They move through `Pending → Processing → Succeeded | Failed`, with
 * `Pending` re-entered after a retryable failure. The replay engine drives
 * the lifecycle; stores only persist and apply conditional updates.
 *
 * - `store`: the store contract plus the in-memory implementation
 * - `sqlite`: rusqlite-backed store
 * - `replay`: the self-rescheduling replay engine
 */

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod replay;
pub mod sqlite;
pub mod store;

pub use replay::{DraftNotifier, DraftReplayEngine, ReplayConfig};
pub use sqlite::SqliteDraftStore;
pub use store::{DraftStore, MemoryDraftStore};

/// Cap for the exponential draft backoff
const MAX_BACKOFF_MS: u64 = 60_000;

/// Fixed delay after a budget-exhausted failure
const BUDGET_BACKOFF: Duration = Duration::from_secs(15);

/// Fixed delay after a compliance failure
const COMPLIANCE_BACKOFF: Duration = Duration::from_secs(30);

/// Lifecycle state of an offline draft
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Waiting for a replay cycle
    Pending,
    /// Claimed by a replay cycle
    Processing,
    /// Terminal: translated
    Succeeded,
    /// Terminal: attempts exhausted or non-retryable error
    Failed,
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for DraftStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            other => Err(anyhow::anyhow!("Invalid draft status: {}", other)),
        }
    }
}

/// A translation request captured while the caller was offline
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OfflineDraft {
    /// Draft identifier (UUID v4)
    pub id: String,
    pub user_id: String,
    pub tenant_id: String,
    /// Original untranslated text
    pub text: String,
    pub target_language: String,
    pub status: DraftStatus,
    /// Completed translate attempts so far
    pub attempts: u32,
    /// Error code of the last failed attempt
    pub last_error_code: Option<String>,
    /// Human-readable reason of the last failed attempt
    pub last_error_reason: Option<String>,
    /// Earliest time the next replay attempt may run
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// Translated text, set on success
    pub result_text: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Set when the draft reaches a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl OfflineDraft {
    /// New pending draft, eligible for the next replay cycle
    pub fn new(
        user_id: impl Into<String>,
        tenant_id: impl Into<String>,
        text: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            tenant_id: tenant_id.into(),
            text: text.into(),
            target_language: target_language.into(),
            status: DraftStatus::Pending,
            attempts: 0,
            last_error_code: None,
            last_error_reason: None,
            next_attempt_at: None,
            result_text: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, DraftStatus::Succeeded | DraftStatus::Failed)
    }

    /// Whether a replay cycle at `now` may pick this draft up
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == DraftStatus::Pending
            && self.next_attempt_at.map(|at| at <= now).unwrap_or(true)
    }
}

/// Delay before the next attempt for a draft that failed with `error_code`
/// after `attempts` completed attempts.
///
/// Budget and compliance failures use fixed longer delays; retrying sooner
/// would only hammer a resource known to be exhausted or a policy known to
/// block. Everything else backs off exponentially from one second, capped
/// at one minute.
pub fn backoff_delay(error_code: &str, attempts: u32) -> Duration {
    match error_code {
        "budget_exceeded" => BUDGET_BACKOFF,
        "compliance_blocked" => COMPLIANCE_BACKOFF,
        _ => {
            let exponent = attempts.saturating_sub(1).min(16);
            let ms = 1_000u64.saturating_mul(1 << exponent).min(MAX_BACKOFF_MS);
            Duration::from_millis(ms)
        }
    }
}
