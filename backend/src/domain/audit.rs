//! Append-only audit trail and its reporting queries.
//!
//! Every domain mutation writes one entry describing the business action, the
//! numeric change, and the actor. Entries are never mutated or deleted. The
//! administrative headcount report depends on "most recent entry per entity"
//! semantics; ties on equal timestamps are broken by insertion order (last
//! inserted wins), which must stay deterministic.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;

use super::ports::{AuditLogRepository, AuditStoreError, UserRepository, UserStoreError};
use super::user::UserId;
use super::Error;

/// Stable audit action codes.
///
/// These are contract values: reports filter on them and operational tooling
/// greps for them, so they must never drift.
pub mod actions {
    /// +10 for a completed delivery.
    pub const POINTS_DELIVERY_ADD: &str = "points.delivery.add";
    /// −10 for a cancelled delivery.
    pub const POINTS_CANCEL_SUBTRACT: &str = "points.cancel.subtract";
    /// −20 per package left undelivered.
    pub const POINTS_UNDELIVERED_SUBTRACT: &str = "points.undelivered.subtract";
    /// −100 for a negative fitness declaration.
    pub const POINTS_LEGAL_SUBTRACT: &str = "points.legal.subtract";
    /// Administrative absolute override of the balance.
    pub const POINTS_SET: &str = "points.set";
    /// Consecutive-delivery streak reset without a balance change.
    pub const POINTS_STREAK_RESET: &str = "points.streak.reset";
    /// Package lifecycle state change.
    pub const PACKAGE_STATE_CHANGE: &str = "package.state.change";
    /// Package assigned to a delivery person.
    pub const PACKAGE_ASSIGN: &str = "package.assign";
    /// Package delivery date changed.
    pub const PACKAGE_DELIVERY_DATE_CHANGE: &str = "package.delivery_date.change";
    /// Bulk delivery-date advance performed by the daily reset.
    pub const PACKAGE_RESET_DATE_ADVANCE: &str = "package.reset.date_advance";
    /// User registered.
    pub const USER_REGISTER: &str = "user.register";
    /// User account activated.
    pub const USER_ACTIVATE: &str = "user.activate";
    /// User account deactivated.
    pub const USER_DEACTIVATE: &str = "user.deactivate";
    /// User updated through a patch.
    pub const USER_UPDATE: &str = "user.update";
    /// Temporary lockout applied.
    pub const USER_LOCKOUT: &str = "user.lockout";
    /// User removed by an administrator.
    pub const USER_REMOVE: &str = "user.remove";
    /// Fitness declaration submitted.
    pub const DECLARATION_SUBMIT: &str = "declaration.submit";
}

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A user account.
    User,
    /// A package.
    Package,
    /// A fitness declaration.
    Declaration,
}

/// Who performed an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRef {
    /// A specific user account.
    User(UserId),
    /// The scheduled system job.
    System,
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{id}"),
            Self::System => f.write_str("system"),
        }
    }
}

/// Audit entry as persisted, carrying the store-assigned insertion sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    /// Monotonic insertion sequence assigned by the store.
    pub sequence: u64,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
    /// Stable action code from [`actions`].
    #[schema(example = "points.delivery.add")]
    pub action: String,
    /// Kind of entity the entry refers to.
    pub entity_type: EntityType,
    /// Identifier of the affected entity.
    pub entity_id: String,
    /// Key→value description of what changed.
    #[schema(value_type = Object)]
    pub changes: Value,
    /// Acting user, or the system job.
    pub performed_by: ActorRef,
}

/// Audit entry before the store assigns its sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
    /// Stable action code from [`actions`].
    pub action: String,
    /// Kind of entity the entry refers to.
    pub entity_type: EntityType,
    /// Identifier of the affected entity.
    pub entity_id: String,
    /// Key→value description of what changed.
    pub changes: Value,
    /// Acting user, or the system job.
    pub performed_by: ActorRef,
}

/// Count of entities whose latest entry carries a given action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionTally {
    /// The winning action code.
    pub action: String,
    /// Number of entities whose latest entry is this action.
    pub entities: u64,
}

/// Detail row for the headcount drill-down.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntityActionRow {
    /// The entity's user identifier.
    pub user_id: UserId,
    /// Given name.
    pub name: String,
    /// Family name.
    pub last_name: String,
    /// The entity's latest action within the window.
    pub last_action: String,
    /// Timestamp of that action.
    pub timestamp: DateTime<Utc>,
}

/// Read side of the audit trail: the raw log and the reporting queries.
///
/// Writers append through the [`AuditLogRepository`] port directly, each
/// service stamping its own entries.
#[derive(Clone)]
pub struct AuditTrail<A, U> {
    audit: Arc<A>,
    users: Arc<U>,
}

impl<A, U> AuditTrail<A, U> {
    /// Create a new trail over the given stores.
    pub fn new(audit: Arc<A>, users: Arc<U>) -> Self {
        Self { audit, users }
    }
}

pub(crate) fn map_audit_error(error: AuditStoreError) -> Error {
    match error {
        AuditStoreError::Connection { message } => {
            Error::service_unavailable(format!("audit store unavailable: {message}"))
        }
        AuditStoreError::Query { message } => {
            Error::internal(format!("audit store error: {message}"))
        }
    }
}

pub(crate) fn map_user_error(error: UserStoreError) -> Error {
    match error {
        UserStoreError::Connection { message } => {
            Error::service_unavailable(format!("user store unavailable: {message}"))
        }
        UserStoreError::Query { message } => {
            Error::internal(format!("user store error: {message}"))
        }
        UserStoreError::RevisionMismatch { expected, actual } => Error::conflict(format!(
            "user revision mismatch: expected {expected}, found {actual}"
        )),
        UserStoreError::DuplicateEmail { email } => {
            Error::conflict(format!("email already registered: {email}"))
        }
    }
}

impl<A, U> AuditTrail<A, U>
where
    A: AuditLogRepository,
    U: UserRepository,
{
    /// Unfiltered read, ordered by insertion.
    pub async fn find_all(&self) -> Result<Vec<AuditLogEntry>, Error> {
        self.audit.find_all().await.map_err(map_audit_error)
    }

    /// Latest entry per entity within the window, as a per-action headcount.
    ///
    /// Entries are restricted to `[start, end]` and the given action codes.
    /// For each entity only the most-recently-timestamped entry counts; when
    /// two entries share a timestamp the later-inserted one wins.
    pub async fn latest_state_transition_per_entity(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actions: &[&str],
    ) -> Result<Vec<ActionTally>, Error> {
        let winners = self.winning_entries(start, end, actions).await?;
        let mut tallies: HashMap<String, u64> = HashMap::new();
        for entry in winners {
            *tallies.entry(entry.action).or_insert(0) += 1;
        }
        let mut tallies: Vec<ActionTally> = tallies
            .into_iter()
            .map(|(action, entities)| ActionTally { action, entities })
            .collect();
        tallies.sort_by(|a, b| a.action.cmp(&b.action));
        Ok(tallies)
    }

    /// Latest entry per entity within the window, joined to the user record.
    ///
    /// One row per entity. Entities whose user record no longer resolves are
    /// skipped with a warning rather than failing the report.
    pub async fn state_detail_per_entity(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actions: &[&str],
    ) -> Result<Vec<EntityActionRow>, Error> {
        let winners = self.winning_entries(start, end, actions).await?;
        let mut rows = Vec::with_capacity(winners.len());
        for entry in winners {
            let Ok(user_id) = UserId::parse(&entry.entity_id) else {
                warn!(entity_id = %entry.entity_id, "audit entity id is not a user id; skipping");
                continue;
            };
            match self.users.find_by_id(&user_id).await.map_err(map_user_error)? {
                Some(user) => rows.push(EntityActionRow {
                    user_id,
                    name: user.name,
                    last_name: user.last_name,
                    last_action: entry.action,
                    timestamp: entry.timestamp,
                }),
                None => {
                    warn!(user_id = %user_id, "audited user no longer exists; skipping row");
                }
            }
        }
        Ok(rows)
    }

    async fn winning_entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        actions: &[&str],
    ) -> Result<Vec<AuditLogEntry>, Error> {
        let actions: Vec<String> = actions.iter().map(|action| (*action).to_owned()).collect();
        let entries = self
            .audit
            .find_range(start, end, &actions)
            .await
            .map_err(map_audit_error)?;
        Ok(latest_per_entity(entries))
    }
}

/// Reduce an insertion-ordered entry list to the winner per entity.
///
/// The winner is the most-recently-timestamped entry; equal timestamps fall
/// back to insertion order, so the last inserted entry wins.
fn latest_per_entity(entries: Vec<AuditLogEntry>) -> Vec<AuditLogEntry> {
    let mut winners: HashMap<String, AuditLogEntry> = HashMap::new();
    for entry in entries {
        match winners.get(&entry.entity_id) {
            Some(current) if entry.timestamp < current.timestamp => {}
            _ => {
                winners.insert(entry.entity_id.clone(), entry);
            }
        }
    }
    let mut winners: Vec<AuditLogEntry> = winners.into_values().collect();
    winners.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
    winners
}
