//! In-memory audit log.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::audit::{AuditLogEntry, NewAuditEntry};
use crate::domain::ports::{AuditLogRepository, AuditStoreError};

#[derive(Default)]
struct AuditDocuments {
    entries: Vec<AuditLogEntry>,
    next_sequence: u64,
}

/// Append-only audit log backed by an in-process vector.
///
/// The store assigns a monotonic sequence on append; the tie-break rule in
/// the reporting queries depends on it reflecting insertion order.
#[derive(Default)]
pub struct MemoryAuditLogRepository {
    inner: RwLock<AuditDocuments>,
}

impl MemoryAuditLogRepository {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLogRepository for MemoryAuditLogRepository {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, AuditStoreError> {
        let mut inner = self.inner.write().await;
        inner.next_sequence += 1;
        let stored = AuditLogEntry {
            sequence: inner.next_sequence,
            timestamp: entry.timestamp,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            changes: entry.changes,
            performed_by: entry.performed_by,
        };
        inner.entries.push(stored.clone());
        Ok(stored)
    }

    async fn find_all(&self) -> Result<Vec<AuditLogEntry>, AuditStoreError> {
        Ok(self.inner.read().await.entries.clone())
    }

    async fn find_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actions: &[String],
    ) -> Result<Vec<AuditLogEntry>, AuditStoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .iter()
            .filter(|entry| {
                entry.timestamp >= start
                    && entry.timestamp <= end
                    && (actions.is_empty() || actions.contains(&entry.action))
            })
            .cloned()
            .collect())
    }
}
