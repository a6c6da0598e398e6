/*!
 * Tests for draft stores (shared behavior across backends)
 */

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use polyroute::drafts::store::DraftPatch;
use polyroute::drafts::{
    DraftStatus, DraftStore, MemoryDraftStore, OfflineDraft, SqliteDraftStore,
};

fn stores() -> Vec<(&'static str, Arc<dyn DraftStore>)> {
    vec![
        ("memory", Arc::new(MemoryDraftStore::new()) as Arc<dyn DraftStore>),
        (
            "sqlite",
            Arc::new(SqliteDraftStore::new_in_memory().unwrap()) as Arc<dyn DraftStore>,
        ),
    ]
}

fn capped_stores(max_per_user: usize) -> Vec<(&'static str, Arc<dyn DraftStore>)> {
    vec![
        (
            "memory",
            Arc::new(MemoryDraftStore::with_limits(max_per_user, 72)) as Arc<dyn DraftStore>,
        ),
        (
            "sqlite",
            Arc::new(
                SqliteDraftStore::new_in_memory()
                    .unwrap()
                    .with_limits(max_per_user, 72),
            ) as Arc<dyn DraftStore>,
        ),
    ]
}

/// Both backends round-trip saved drafts and scope gets by user
#[tokio::test]
async fn test_store_saveAndGet_shouldRoundTripAcrossBackends() -> Result<()> {
    for (name, store) in stores() {
        let draft = store
            .save(OfflineDraft::new("u1", "contoso", "hello", "fr"))
            .await?;

        let fetched = store.get("u1", &draft.id).await?;
        assert!(fetched.is_some(), "backend {}", name);
        assert_eq!(fetched.unwrap().text, "hello");
        assert!(store.get("other", &draft.id).await?.is_none(), "backend {}", name);
    }
    Ok(())
}

/// The conditional update claims a pending draft exactly once
#[tokio::test]
async fn test_store_updateIfStatus_shouldClaimOnce() -> Result<()> {
    for (name, store) in stores() {
        let draft = store
            .save(OfflineDraft::new("u1", "contoso", "hello", "fr"))
            .await?;

        let first = store
            .update_if_status("u1", &draft.id, DraftStatus::Pending, DraftPatch::claim())
            .await?;
        let second = store
            .update_if_status("u1", &draft.id, DraftStatus::Pending, DraftPatch::claim())
            .await?;

        assert!(first, "backend {}", name);
        assert!(!second, "backend {}", name);
        assert_eq!(
            store.get("u1", &draft.id).await?.unwrap().status,
            DraftStatus::Processing,
            "backend {}",
            name
        );
    }
    Ok(())
}

/// A no-op conditional update leaves the draft untouched
#[tokio::test]
async fn test_store_updateIfStatus_staleExpectation_shouldNotMutate() -> Result<()> {
    for (name, store) in stores() {
        let draft = store
            .save(OfflineDraft::new("u1", "contoso", "hello", "fr"))
            .await?;

        let updated = store
            .update_if_status(
                "u1",
                &draft.id,
                DraftStatus::Processing,
                DraftPatch::succeeded("bonjour", 1, Utc::now()),
            )
            .await?;

        assert!(!updated, "backend {}", name);
        let unchanged = store.get("u1", &draft.id).await?.unwrap();
        assert_eq!(unchanged.status, DraftStatus::Pending, "backend {}", name);
        assert!(unchanged.result_text.is_none(), "backend {}", name);
    }
    Ok(())
}

/// list_pending returns only pending drafts, oldest first
#[tokio::test]
async fn test_store_listPending_shouldExcludeClaimedDrafts() -> Result<()> {
    for (name, store) in stores() {
        let mut older = OfflineDraft::new("u1", "contoso", "older", "fr");
        older.created_at = Utc::now() - Duration::minutes(5);
        store.save(older).await?;
        let claimed = store
            .save(OfflineDraft::new("u1", "contoso", "claimed", "fr"))
            .await?;
        store
            .update_if_status("u1", &claimed.id, DraftStatus::Pending, DraftPatch::claim())
            .await?;

        let pending = store.list_pending().await?;
        assert_eq!(pending.len(), 1, "backend {}", name);
        assert_eq!(pending[0].text, "older", "backend {}", name);
    }
    Ok(())
}

/// A user at the cap loses the oldest draft when a genuinely new one arrives
#[tokio::test]
async fn test_store_savePastCap_shouldEvictOldestFirst() -> Result<()> {
    for (name, store) in capped_stores(2) {
        let mut oldest = OfflineDraft::new("u1", "contoso", "oldest", "fr");
        oldest.created_at = Utc::now() - Duration::minutes(10);
        let oldest = store.save(oldest).await?;
        let mut middle = OfflineDraft::new("u1", "contoso", "middle", "fr");
        middle.created_at = Utc::now() - Duration::minutes(5);
        store.save(middle).await?;

        let newest = store
            .save(OfflineDraft::new("u1", "contoso", "newest", "fr"))
            .await?;

        assert!(store.get("u1", &oldest.id).await?.is_none(), "backend {}", name);
        assert!(store.get("u1", &newest.id).await?.is_some(), "backend {}", name);
    }
    Ok(())
}

/// Re-saving an existing draft replaces it in place and never triggers
/// eviction, even with the user at the cap
#[tokio::test]
async fn test_store_resaveAtCap_shouldNotEvict() -> Result<()> {
    for (name, store) in capped_stores(2) {
        let mut oldest = OfflineDraft::new("u1", "contoso", "oldest", "fr");
        oldest.created_at = Utc::now() - Duration::minutes(10);
        let oldest = store.save(oldest).await?;
        let mut newer = store
            .save(OfflineDraft::new("u1", "contoso", "newer", "fr"))
            .await?;

        newer.next_attempt_at = Some(Utc::now());
        store.save(newer.clone()).await?;

        assert!(store.get("u1", &oldest.id).await?.is_some(), "backend {}", name);
        let replaced = store.get("u1", &newer.id).await?.unwrap();
        assert!(replaced.next_attempt_at.is_some(), "backend {}", name);
    }
    Ok(())
}

/// Stores remain usable from synchronous callers via a blocking bridge
#[test]
fn test_store_pruneExpired_freshDrafts_shouldDeleteNothing() {
    let deleted = tokio_test::block_on(async {
        let store = MemoryDraftStore::new();
        store
            .save(OfflineDraft::new("u1", "contoso", "hello", "fr"))
            .await?;
        store.prune_expired().await
    });
    assert_eq!(deleted.unwrap(), 0);
}

/// A successful terminal patch records the result and completion time
#[tokio::test]
async fn test_store_succeededPatch_shouldRecordResult() -> Result<()> {
    for (name, store) in stores() {
        let draft = store
            .save(OfflineDraft::new("u1", "contoso", "hello", "fr"))
            .await?;
        store
            .update_if_status("u1", &draft.id, DraftStatus::Pending, DraftPatch::claim())
            .await?;
        store
            .update_if_status(
                "u1",
                &draft.id,
                DraftStatus::Processing,
                DraftPatch::succeeded("bonjour", 1, Utc::now()),
            )
            .await?;

        let done = store.get("u1", &draft.id).await?.unwrap();
        assert_eq!(done.status, DraftStatus::Succeeded, "backend {}", name);
        assert_eq!(done.result_text.as_deref(), Some("bonjour"), "backend {}", name);
        assert_eq!(done.attempts, 1, "backend {}", name);
        assert!(done.completed_at.is_some(), "backend {}", name);
        assert!(done.next_attempt_at.is_none(), "backend {}", name);
    }
    Ok(())
}
