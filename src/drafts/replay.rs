/*!
 * Background replay of offline drafts.
 *
 * Each cycle claims due pending drafts one at a time through the store's
 * conditional update, runs them through the translation pipeline and writes
 * the outcome back. The claim is what keeps concurrent engines (or an
 * overlapping cycle) from replaying the same draft twice, and it is also
 * what guarantees terminal notifications fire exactly once.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use log::{debug, error, info, warn};
use tokio::sync::watch;

use super::store::{DraftPatch, DraftStore};
use super::{DraftStatus, OfflineDraft, backoff_delay};
use crate::errors::RouteError;
use crate::pipeline::{TranslateOutcome, TranslationPipeline};
use crate::request::TranslationRequest;

/// Default delay between replay cycles
pub const DEFAULT_CYCLE_INTERVAL_SECS: u64 = 30;

/// Default attempt ceiling before a draft is marked failed
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Receives exactly-once notifications when a draft reaches a terminal state
#[async_trait]
pub trait DraftNotifier: Send + Sync {
    async fn draft_succeeded(&self, draft: &OfflineDraft);
    async fn draft_failed(&self, draft: &OfflineDraft);
}

/// Replay engine tuning
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Delay between cycles
    pub interval: Duration,

    /// Attempt ceiling; reaching it marks the draft failed
    pub max_attempts: u32,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CYCLE_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Periodic worker that retries queued drafts through the pipeline
pub struct DraftReplayEngine {
    pipeline: Arc<TranslationPipeline>,
    store: Arc<dyn DraftStore>,
    notifier: Option<Arc<dyn DraftNotifier>>,
    config: ReplayConfig,
    running: AtomicBool,
    shutdown: parking_lot::Mutex<Option<watch::Sender<bool>>>,
}

impl DraftReplayEngine {
    pub fn new(pipeline: Arc<TranslationPipeline>, store: Arc<dyn DraftStore>) -> Self {
        Self {
            pipeline,
            store,
            notifier: None,
            config: ReplayConfig::default(),
            running: AtomicBool::new(false),
            shutdown: parking_lot::Mutex::new(None),
        }
    }

    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn DraftNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the background loop. Idempotent; a second call is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Replay engine already running");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        *self.shutdown.lock() = Some(tx);

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            info!(
                "Draft replay engine started (interval: {:?}, max attempts: {})",
                engine.config.interval, engine.config.max_attempts
            );
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(engine.config.interval) => {
                        if let Err(e) = engine.run_cycle().await {
                            error!("Replay cycle failed: {}", e);
                        }
                    }
                    _ = rx.changed() => {
                        info!("Draft replay engine stopping");
                        break;
                    }
                }
            }
            engine.running.store(false, Ordering::SeqCst);
        });
    }

    /// Signal the background loop to stop. Idempotent.
    pub fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(true);
        }
    }

    /// Run one replay cycle: prune expired drafts, then attempt every due
    /// pending draft. Public so schedulers and tests can drive cycles
    /// deterministically.
    pub async fn run_cycle(&self) -> Result<()> {
        let pruned = self.store.prune_expired().await?;
        if pruned > 0 {
            debug!("Pruned {} expired draft(s)", pruned);
        }

        let pending = self.store.list_pending().await?;
        let now = self.store.now();
        let due: Vec<OfflineDraft> = pending.into_iter().filter(|d| d.is_due(now)).collect();
        if due.is_empty() {
            return Ok(());
        }
        debug!("Replaying {} due draft(s)", due.len());

        for draft in due {
            if let Err(e) = self.replay_one(draft).await {
                // One bad draft must not stall the rest of the queue.
                error!("Draft replay error: {}", e);
            }
        }
        Ok(())
    }

    /// Claim and replay a single draft
    async fn replay_one(&self, draft: OfflineDraft) -> Result<()> {
        let claimed = self
            .store
            .update_if_status(
                &draft.user_id,
                &draft.id,
                DraftStatus::Pending,
                DraftPatch::claim(),
            )
            .await?;
        if !claimed {
            debug!("Draft {} already claimed elsewhere, skipping", draft.id);
            return Ok(());
        }

        // Another engine can finish a whole attempt between listing and the
        // claim; the post-claim row is the authoritative snapshot.
        let Some(draft) = self.store.get(&draft.user_id, &draft.id).await? else {
            debug!("Draft {} vanished after claim, skipping", draft.id);
            return Ok(());
        };

        let attempts = draft.attempts + 1;
        let request = TranslationRequest::new(
            &draft.text,
            &draft.target_language,
            &draft.tenant_id,
            &draft.user_id,
        );

        let patch = match self.pipeline.translate(&request).await {
            Ok(outcome) => {
                // A glossary conflict still produced a translation; drafts
                // carry no decisions, so the partial text is the result.
                let text = match outcome {
                    TranslateOutcome::Completed(t) => t.text,
                    TranslateOutcome::NeedsGlossaryResolution { translation, .. } => {
                        warn!(
                            "Draft {} completed with unresolved glossary terms",
                            draft.id
                        );
                        translation.text
                    }
                };
                info!("Draft {} replayed successfully on attempt {}", draft.id, attempts);
                DraftPatch::succeeded(text, attempts, self.store.now())
            }
            Err(e) => self.failure_patch(&draft, &e, attempts),
        };

        let terminal = matches!(
            patch.status,
            Some(DraftStatus::Succeeded) | Some(DraftStatus::Failed)
        );
        let updated = self
            .store
            .update_if_status(&draft.user_id, &draft.id, DraftStatus::Processing, patch)
            .await?;

        if updated && terminal {
            self.notify(&draft.user_id, &draft.id).await;
        }
        Ok(())
    }

    fn failure_patch(&self, draft: &OfflineDraft, error: &RouteError, attempts: u32) -> DraftPatch {
        let code = error.code();
        let reason = error.to_string();

        if !error.is_retryable() {
            warn!(
                "Draft {} failed permanently ({}): {}",
                draft.id, code, reason
            );
            return DraftPatch::failed(attempts, code, reason, self.store.now());
        }
        if attempts >= self.config.max_attempts {
            warn!(
                "Draft {} exhausted {} attempts, marking failed",
                draft.id, attempts
            );
            return DraftPatch::failed(attempts, code, reason, self.store.now());
        }

        let delay = backoff_delay(code, attempts);
        let next_attempt_at = self.store.now()
            + ChronoDuration::milliseconds(delay.as_millis() as i64);
        debug!(
            "Draft {} attempt {} failed ({}), next attempt in {:?}",
            draft.id, attempts, code, delay
        );
        DraftPatch::retry(attempts, code, reason, next_attempt_at)
    }

    /// Fire-and-forget terminal notification
    async fn notify(&self, user_id: &str, draft_id: &str) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        match self.store.get(user_id, draft_id).await {
            Ok(Some(draft)) => {
                tokio::spawn(async move {
                    match draft.status {
                        DraftStatus::Succeeded => notifier.draft_succeeded(&draft).await,
                        DraftStatus::Failed => notifier.draft_failed(&draft).await,
                        _ => {}
                    }
                });
            }
            Ok(None) => {}
            Err(e) => warn!("Could not load draft {} for notification: {}", draft_id, e),
        }
    }
}
