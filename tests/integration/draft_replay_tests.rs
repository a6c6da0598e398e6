/*!
 * Full lifecycle tests for the offline draft replay engine
 */

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use polyroute::drafts::store::DraftPatch;
use polyroute::drafts::{
    DraftReplayEngine, DraftStatus, DraftStore, OfflineDraft, ReplayConfig,
};
use polyroute::providers::Provider;
use polyroute::providers::mock::MockProvider;

use crate::common::{eu_spec, permissive_pipeline};

fn engine_over(
    providers: Vec<Arc<dyn Provider>>,
    max_attempts: u32,
) -> (Arc<DraftReplayEngine>, Arc<polyroute::drafts::MemoryDraftStore>) {
    let (pipeline, store) = permissive_pipeline(providers);
    let engine = Arc::new(
        DraftReplayEngine::new(pipeline, store.clone() as Arc<dyn DraftStore>).with_config(
            ReplayConfig {
                interval: Duration::from_secs(30),
                max_attempts,
            },
        ),
    );
    (engine, store)
}

async fn queue(store: &polyroute::drafts::MemoryDraftStore, text: &str) -> OfflineDraft {
    store
        .save(OfflineDraft::new("u1", "contoso", text, "fr"))
        .await
        .unwrap()
}

/// Happy path: one cycle takes a pending draft to Succeeded
#[tokio::test]
async fn test_replay_pendingDraft_shouldSucceedInOneCycle() {
    let provider: Arc<dyn Provider> = Arc::new(MockProvider::working(eu_spec("alpha")));
    let (engine, store) = engine_over(vec![provider], 5);
    let draft = queue(&store, "hello world").await;

    engine.run_cycle().await.unwrap();

    let done = store.get("u1", &draft.id).await.unwrap().unwrap();
    assert_eq!(done.status, DraftStatus::Succeeded);
    assert_eq!(done.attempts, 1);
    assert!(done.result_text.is_some());
    assert!(done.completed_at.is_some());
}

/// A provider that fails once and then recovers yields Succeeded with two
/// recorded attempts
#[tokio::test]
async fn test_replay_failOnceThenRecover_shouldSucceedOnSecondAttempt() {
    let provider: Arc<dyn Provider> = Arc::new(MockProvider::flaky(eu_spec("alpha"), 1));
    let (engine, store) = engine_over(vec![provider], 5);
    let draft = queue(&store, "hello world").await;

    engine.run_cycle().await.unwrap();

    // First cycle records the failure and reschedules.
    let mut rescheduled = store.get("u1", &draft.id).await.unwrap().unwrap();
    assert_eq!(rescheduled.status, DraftStatus::Pending);
    assert_eq!(rescheduled.attempts, 1);
    assert!(rescheduled.next_attempt_at.unwrap() > Utc::now());

    // Make the draft due now instead of waiting out the backoff.
    rescheduled.next_attempt_at = Some(Utc::now());
    store.save(rescheduled).await.unwrap();

    engine.run_cycle().await.unwrap();

    let done = store.get("u1", &draft.id).await.unwrap().unwrap();
    assert_eq!(done.status, DraftStatus::Succeeded);
    assert_eq!(done.attempts, 2);
    assert!(done.last_error_code.is_some());
}

/// Exhausting the attempt ceiling marks the draft Failed with a completion
/// time and no further schedule
#[tokio::test]
async fn test_replay_persistentFailure_shouldEndFailedAfterMaxAttempts() {
    let provider: Arc<dyn Provider> = Arc::new(MockProvider::failing(eu_spec("alpha")));
    let (engine, store) = engine_over(vec![provider], 3);
    let draft = queue(&store, "hello world").await;

    for _ in 0..3 {
        engine.run_cycle().await.unwrap();
        // Clear the backoff so the next cycle picks the draft up again.
        if let Some(mut current) = store.get("u1", &draft.id).await.unwrap() {
            if current.status == DraftStatus::Pending {
                current.next_attempt_at = Some(Utc::now());
                store.save(current).await.unwrap();
            }
        }
    }

    let failed = store.get("u1", &draft.id).await.unwrap().unwrap();
    assert_eq!(failed.status, DraftStatus::Failed);
    assert_eq!(failed.attempts, 3);
    assert_eq!(
        failed.last_error_code.as_deref(),
        Some("all_providers_failed")
    );
    assert!(failed.completed_at.is_some());
    assert!(failed.next_attempt_at.is_none());
}

/// Terminal drafts are never picked up again
#[tokio::test]
async fn test_replay_terminalDraft_shouldBeIgnoredByLaterCycles() {
    let provider = Arc::new(MockProvider::working(eu_spec("alpha")));
    let (engine, store) = engine_over(vec![provider.clone() as Arc<dyn Provider>], 5);
    let draft = queue(&store, "hello world").await;

    engine.run_cycle().await.unwrap();
    let calls_after_first = provider.calls();
    engine.run_cycle().await.unwrap();

    assert_eq!(provider.calls(), calls_after_first);
    let done = store.get("u1", &draft.id).await.unwrap().unwrap();
    assert_eq!(done.attempts, 1);
}

/// A draft already claimed by another worker is skipped
#[tokio::test]
async fn test_replay_alreadyClaimedDraft_shouldBeSkipped() {
    let provider = Arc::new(MockProvider::working(eu_spec("alpha")));
    let (engine, store) = engine_over(vec![provider.clone() as Arc<dyn Provider>], 5);
    let draft = queue(&store, "hello world").await;

    // Simulate a concurrent engine claiming the draft between listing and
    // claiming.
    store
        .update_if_status("u1", &draft.id, DraftStatus::Pending, DraftPatch::claim())
        .await
        .unwrap();

    engine.run_cycle().await.unwrap();

    assert_eq!(provider.calls(), 0);
    let untouched = store.get("u1", &draft.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, DraftStatus::Processing);
}
