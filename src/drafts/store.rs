/*!
 * Draft store contract and the in-memory implementation.
 *
 * The store is an injected collaborator: the replay engine only relies on
 * the conditional update being atomic per draft, which is what makes the
 * claim step safe under overlapping cycles.
 */

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::debug;
use parking_lot::Mutex;

use super::{DraftStatus, OfflineDraft};

/// Default cap on stored drafts per user
pub const DEFAULT_MAX_PER_USER: usize = 50;

/// Default retention for drafts before pruning, in hours
pub const DEFAULT_RETENTION_HOURS: i64 = 72;

/// A partial update applied through [`DraftStore::update_if_status`]
#[derive(Debug, Clone, Default)]
pub struct DraftPatch {
    pub status: Option<DraftStatus>,
    pub attempts: Option<u32>,
    /// (code, reason) of the failure being recorded
    pub last_error: Option<(String, String)>,
    pub next_attempt_at: Option<DateTime<Utc>>,
    /// Clear `next_attempt_at` (terminal states)
    pub clear_next_attempt: bool,
    pub result_text: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DraftPatch {
    /// Claim patch: Pending → Processing
    pub fn claim() -> Self {
        Self {
            status: Some(DraftStatus::Processing),
            ..Default::default()
        }
    }

    /// Terminal success patch
    pub fn succeeded(result_text: impl Into<String>, attempts: u32, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(DraftStatus::Succeeded),
            attempts: Some(attempts),
            result_text: Some(result_text.into()),
            completed_at: Some(now),
            clear_next_attempt: true,
            ..Default::default()
        }
    }

    /// Retryable failure patch: back to Pending with a scheduled retry
    pub fn retry(
        attempts: u32,
        error_code: impl Into<String>,
        error_reason: impl Into<String>,
        next_attempt_at: DateTime<Utc>,
    ) -> Self {
        Self {
            status: Some(DraftStatus::Pending),
            attempts: Some(attempts),
            last_error: Some((error_code.into(), error_reason.into())),
            next_attempt_at: Some(next_attempt_at),
            ..Default::default()
        }
    }

    /// Terminal failure patch
    pub fn failed(
        attempts: u32,
        error_code: impl Into<String>,
        error_reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            status: Some(DraftStatus::Failed),
            attempts: Some(attempts),
            last_error: Some((error_code.into(), error_reason.into())),
            completed_at: Some(now),
            clear_next_attempt: true,
            ..Default::default()
        }
    }

    /// Apply this patch to a draft in place
    pub fn apply_to(&self, draft: &mut OfflineDraft) {
        if let Some(status) = self.status {
            draft.status = status;
        }
        if let Some(attempts) = self.attempts {
            draft.attempts = attempts;
        }
        if let Some((code, reason)) = &self.last_error {
            draft.last_error_code = Some(code.clone());
            draft.last_error_reason = Some(reason.clone());
        }
        if let Some(at) = self.next_attempt_at {
            draft.next_attempt_at = Some(at);
        }
        if self.clear_next_attempt {
            draft.next_attempt_at = None;
        }
        if let Some(text) = &self.result_text {
            draft.result_text = Some(text.clone());
        }
        if let Some(at) = self.completed_at {
            draft.completed_at = Some(at);
        }
    }
}

/// Persistence contract for offline drafts
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Persist a draft, enforcing the per-user cap (oldest evicted first)
    async fn save(&self, draft: OfflineDraft) -> Result<OfflineDraft>;

    /// Fetch one draft
    async fn get(&self, user_id: &str, draft_id: &str) -> Result<Option<OfflineDraft>>;

    /// All drafts currently in `Pending`, oldest first
    async fn list_pending(&self) -> Result<Vec<OfflineDraft>>;

    /// Apply `patch` iff the draft's status equals `expected`.
    ///
    /// Returns false when the draft is missing or its status moved on; this
    /// is the atomic claim the replay engine relies on.
    async fn update_if_status(
        &self,
        user_id: &str,
        draft_id: &str,
        expected: DraftStatus,
        patch: DraftPatch,
    ) -> Result<bool>;

    /// Delete drafts older than the retention window; returns how many
    async fn prune_expired(&self) -> Result<usize>;

    /// Store clock; overridable in tests
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// In-memory store for tests and single-process deployments
pub struct MemoryDraftStore {
    drafts: Mutex<HashMap<String, OfflineDraft>>,
    max_per_user: usize,
    retention: ChronoDuration,
}

impl Default for MemoryDraftStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_PER_USER, DEFAULT_RETENTION_HOURS)
    }

    pub fn with_limits(max_per_user: usize, retention_hours: i64) -> Self {
        Self {
            drafts: Mutex::new(HashMap::new()),
            max_per_user,
            retention: ChronoDuration::hours(retention_hours),
        }
    }

    pub fn len(&self) -> usize {
        self.drafts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.lock().is_empty()
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn save(&self, draft: OfflineDraft) -> Result<OfflineDraft> {
        let mut drafts = self.drafts.lock();

        // Per-user cap, oldest evicted first. Re-saving an existing draft
        // replaces it in place, so its own id does not count against the cap.
        let mut user_drafts: Vec<(String, DateTime<Utc>)> = drafts
            .values()
            .filter(|d| d.user_id == draft.user_id && d.id != draft.id)
            .map(|d| (d.id.clone(), d.created_at))
            .collect();
        if user_drafts.len() >= self.max_per_user {
            user_drafts.sort_by_key(|(_, created)| *created);
            let to_evict = user_drafts.len() + 1 - self.max_per_user;
            for (id, _) in user_drafts.into_iter().take(to_evict) {
                debug!("Evicting draft {} for user {}", id, draft.user_id);
                drafts.remove(&id);
            }
        }

        drafts.insert(draft.id.clone(), draft.clone());
        Ok(draft)
    }

    async fn get(&self, user_id: &str, draft_id: &str) -> Result<Option<OfflineDraft>> {
        Ok(self
            .drafts
            .lock()
            .get(draft_id)
            .filter(|d| d.user_id == user_id)
            .cloned())
    }

    async fn list_pending(&self) -> Result<Vec<OfflineDraft>> {
        let mut pending: Vec<OfflineDraft> = self
            .drafts
            .lock()
            .values()
            .filter(|d| d.status == DraftStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|d| d.created_at);
        Ok(pending)
    }

    async fn update_if_status(
        &self,
        user_id: &str,
        draft_id: &str,
        expected: DraftStatus,
        patch: DraftPatch,
    ) -> Result<bool> {
        let mut drafts = self.drafts.lock();
        match drafts.get_mut(draft_id) {
            Some(draft) if draft.user_id == user_id && draft.status == expected => {
                patch.apply_to(draft);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn prune_expired(&self) -> Result<usize> {
        let cutoff = self.now() - self.retention;
        let mut drafts = self.drafts.lock();
        let before = drafts.len();
        drafts.retain(|_, d| d.created_at >= cutoff);
        Ok(before - drafts.len())
    }
}
