/*!
 * Audit trail for routed translations.
 *
 * Every successful routing emits one audit record. The source text itself is
 * never stored; records carry a SHA-256 fingerprint of it instead.
 */

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

/// Fingerprint of the source text: lowercase hex SHA-256
pub fn source_fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One routed translation, as recorded for audit
#[derive(Debug, Clone)]
pub struct AuditRecord {
    pub user_id: String,
    pub tenant_id: String,
    /// SHA-256 of the source text
    pub source_fingerprint: String,
    pub translated_text: String,
    /// Provider/model that produced the result
    pub model_id: String,
    pub latency_ms: u64,
    /// Free-form annotations (detected language, cost, retry count)
    pub metadata: HashMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

/// Consumer of audit records. Injected into the router; recording failures
/// are the sink's own concern and must not fail routing.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord);
}

/// Sink that writes records to the application log
#[derive(Default)]
pub struct LogAuditSink;

#[async_trait]
impl AuditSink for LogAuditSink {
    async fn record(&self, record: AuditRecord) {
        info!(
            "audit: tenant={} user={} model={} latency_ms={} fingerprint={}",
            record.tenant_id,
            record.user_id,
            record.model_id,
            record.latency_ms,
            &record.source_fingerprint[..12]
        );
    }
}

/// In-memory sink for tests
#[derive(Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) {
        self.records.lock().push(record);
    }
}
