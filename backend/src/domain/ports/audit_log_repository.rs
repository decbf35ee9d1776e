//! Port for the append-only audit log store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::audit::{AuditLogEntry, NewAuditEntry};

/// Persistence errors raised by audit log adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditStoreError {
    /// Store connection could not be established.
    #[error("audit store connection failed: {message}")]
    Connection {
        /// Adapter-specific description.
        message: String,
    },
    /// Query or insert failed during execution.
    #[error("audit store query failed: {message}")]
    Query {
        /// Adapter-specific description.
        message: String,
    },
}

/// Port for the audit log.
///
/// The store assigns a monotonic insertion sequence on append; entries are
/// never mutated or deleted afterwards.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Pure insert; returns the entry with its assigned sequence.
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, AuditStoreError>;

    /// Unfiltered read, ordered by insertion.
    async fn find_all(&self) -> Result<Vec<AuditLogEntry>, AuditStoreError>;

    /// Entries within `[start, end]` whose action is in `actions`, ordered by
    /// insertion.
    async fn find_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actions: &[String],
    ) -> Result<Vec<AuditLogEntry>, AuditStoreError>;
}

/// Fixture implementation for tests that do not inspect the audit log.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAuditLogRepository;

#[async_trait]
impl AuditLogRepository for FixtureAuditLogRepository {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry, AuditStoreError> {
        Ok(AuditLogEntry {
            sequence: 0,
            timestamp: entry.timestamp,
            action: entry.action,
            entity_type: entry.entity_type,
            entity_id: entry.entity_id,
            changes: entry.changes,
            performed_by: entry.performed_by,
        })
    }

    async fn find_all(&self) -> Result<Vec<AuditLogEntry>, AuditStoreError> {
        Ok(Vec::new())
    }

    async fn find_range(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _actions: &[String],
    ) -> Result<Vec<AuditLogEntry>, AuditStoreError> {
        Ok(Vec::new())
    }
}
