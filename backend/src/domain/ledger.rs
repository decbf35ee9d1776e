//! Rewards ledger: point balances and the consecutive-delivery streak.
//!
//! Deltas are fixed business constants. Every mutation commits the balance
//! through a compare-and-set save with retry, then writes exactly one audit
//! entry. The audit write is deliberately last: a crash between the two can
//! only lose logging, never the financial effect. A failed audit write is
//! surfaced as [`ErrorCode::AuditDegraded`](crate::domain::ErrorCode) instead
//! of silent success and never rolls the balance back.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::{json, Value};
use tracing::error;

use super::audit::{actions, map_audit_error, map_user_error, ActorRef, EntityType, NewAuditEntry};
use super::ports::{
    AuditLogRepository, LedgerReceipt, RewardsCommand, UserRepository, UserStoreError,
};
use super::user::{require_user, User, UserId};
use super::Error;

/// Points granted for a completed delivery.
pub const DELIVERY_REWARD: i64 = 10;
/// Points deducted for a cancelled delivery.
pub const CANCELLATION_PENALTY: i64 = 10;
/// Points deducted per package left undelivered at day end.
pub const UNDELIVERED_PENALTY_PER_PACKAGE: i64 = 20;
/// Points deducted after a negative fitness declaration.
pub const NEGATIVE_DECLARATION_PENALTY: i64 = 100;

/// How a mutation affects the consecutive-delivery streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreakChange {
    Increment,
    Reset,
    Keep,
}

/// The rewards ledger service.
#[derive(Clone)]
pub struct RewardsLedger<U, A> {
    users: Arc<U>,
    audit: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<U, A> RewardsLedger<U, A> {
    /// Create a ledger over the given stores.
    pub fn new(users: Arc<U>, audit: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            audit,
            clock,
        }
    }
}

impl<U, A> RewardsLedger<U, A>
where
    U: UserRepository,
    A: AuditLogRepository,
{
    /// Commit a balance/streak change through compare-and-set with retry.
    ///
    /// A revision mismatch means another writer committed first; the cycle
    /// re-reads and retries, so concurrent mutations are serialised without
    /// ever losing one. Returns the record before and after the change.
    async fn commit(
        &self,
        user_id: &UserId,
        delta: i64,
        streak: StreakChange,
    ) -> Result<(User, User), Error> {
        loop {
            let current = require_user(
                self.users.find_by_id(user_id).await.map_err(map_user_error)?,
                user_id,
            )?;
            let mut updated = current.clone();
            updated.points = current.points + delta;
            updated.consecutive_deliveries = match streak {
                StreakChange::Increment => current.consecutive_deliveries + 1,
                StreakChange::Reset => 0,
                StreakChange::Keep => current.consecutive_deliveries,
            };
            updated.revision = current.revision + 1;
            match self.users.save(&updated, current.revision).await {
                Ok(()) => return Ok((current, updated)),
                Err(UserStoreError::RevisionMismatch { .. }) => continue,
                Err(err) => return Err(map_user_error(err)),
            }
        }
    }

    /// Write the paired audit entry for an already committed mutation.
    async fn record(
        &self,
        action: &str,
        user_id: &UserId,
        performed_by: ActorRef,
        changes: Value,
    ) -> Result<(), Error> {
        let entry = NewAuditEntry {
            timestamp: self.clock.utc(),
            action: action.to_owned(),
            entity_type: EntityType::User,
            entity_id: user_id.to_string(),
            changes: changes.clone(),
            performed_by,
        };
        if let Err(err) = self.audit.append(entry).await {
            let err = map_audit_error(err);
            error!(
                action,
                user_id = %user_id,
                error = %err,
                "ledger mutation committed but its audit entry failed"
            );
            return Err(Error::audit_degraded(format!(
                "balance change applied but audit entry for {action} failed"
            ))
            .with_details(json!({
                "action": action,
                "entityId": user_id.to_string(),
                "applied": true,
                "changes": changes,
            })));
        }
        Ok(())
    }

    fn receipt(user: &User) -> LedgerReceipt {
        LedgerReceipt {
            user_id: user.id,
            points: user.points,
            consecutive_deliveries: user.consecutive_deliveries,
        }
    }

    fn points_change(before: &User, after: &User, delta: i64) -> Value {
        json!({
            "points": { "from": before.points, "to": after.points, "delta": delta },
            "consecutiveDeliveries": {
                "from": before.consecutive_deliveries,
                "to": after.consecutive_deliveries,
            },
        })
    }
}

#[async_trait]
impl<U, A> RewardsCommand for RewardsLedger<U, A>
where
    U: UserRepository,
    A: AuditLogRepository,
{
    async fn add_points_for_delivery(&self, user_id: &UserId) -> Result<LedgerReceipt, Error> {
        let (before, after) = self
            .commit(user_id, DELIVERY_REWARD, StreakChange::Increment)
            .await?;
        self.record(
            actions::POINTS_DELIVERY_ADD,
            user_id,
            ActorRef::User(*user_id),
            Self::points_change(&before, &after, DELIVERY_REWARD),
        )
        .await?;
        Ok(Self::receipt(&after))
    }

    async fn subtract_points_for_cancellation(
        &self,
        user_id: &UserId,
    ) -> Result<LedgerReceipt, Error> {
        let (before, after) = self
            .commit(user_id, -CANCELLATION_PENALTY, StreakChange::Reset)
            .await?;
        self.record(
            actions::POINTS_CANCEL_SUBTRACT,
            user_id,
            ActorRef::User(*user_id),
            Self::points_change(&before, &after, -CANCELLATION_PENALTY),
        )
        .await?;
        Ok(Self::receipt(&after))
    }

    async fn subtract_points_for_undelivered_packages(
        &self,
        user_id: &UserId,
        packages_count: u32,
        performed_by: ActorRef,
    ) -> Result<LedgerReceipt, Error> {
        let delta = -(UNDELIVERED_PENALTY_PER_PACKAGE * i64::from(packages_count));
        let (before, after) = self.commit(user_id, delta, StreakChange::Reset).await?;
        let mut changes = Self::points_change(&before, &after, delta);
        if let Some(map) = changes.as_object_mut() {
            map.insert("packagesCount".to_owned(), json!(packages_count));
        }
        self.record(
            actions::POINTS_UNDELIVERED_SUBTRACT,
            user_id,
            performed_by,
            changes,
        )
        .await?;
        Ok(Self::receipt(&after))
    }

    async fn subtract_points_for_negative_declaration(
        &self,
        user_id: &UserId,
    ) -> Result<LedgerReceipt, Error> {
        let (before, after) = self
            .commit(user_id, -NEGATIVE_DECLARATION_PENALTY, StreakChange::Reset)
            .await?;
        self.record(
            actions::POINTS_LEGAL_SUBTRACT,
            user_id,
            ActorRef::User(*user_id),
            Self::points_change(&before, &after, -NEGATIVE_DECLARATION_PENALTY),
        )
        .await?;
        Ok(Self::receipt(&after))
    }

    async fn reset_consecutive_deliveries(
        &self,
        user_id: &UserId,
    ) -> Result<LedgerReceipt, Error> {
        let (before, after) = self.commit(user_id, 0, StreakChange::Reset).await?;
        self.record(
            actions::POINTS_STREAK_RESET,
            user_id,
            ActorRef::User(*user_id),
            json!({
                "consecutiveDeliveries": {
                    "from": before.consecutive_deliveries,
                    "to": after.consecutive_deliveries,
                },
            }),
        )
        .await?;
        Ok(Self::receipt(&after))
    }

    async fn set_points(
        &self,
        user_id: &UserId,
        points: i64,
        performed_by: ActorRef,
    ) -> Result<LedgerReceipt, Error> {
        // Absolute override: replace rather than apply a delta.
        let (before, after) = loop {
            let current = require_user(
                self.users.find_by_id(user_id).await.map_err(map_user_error)?,
                user_id,
            )?;
            let mut updated = current.clone();
            updated.points = points;
            updated.revision = current.revision + 1;
            match self.users.save(&updated, current.revision).await {
                Ok(()) => break (current, updated),
                Err(UserStoreError::RevisionMismatch { .. }) => continue,
                Err(err) => return Err(map_user_error(err)),
            }
        };
        self.record(
            actions::POINTS_SET,
            user_id,
            performed_by,
            json!({
                "points": { "from": before.points, "to": after.points },
                "performedBy": performed_by.to_string(),
            }),
        )
        .await?;
        Ok(Self::receipt(&after))
    }

    async fn get_user_points(&self, user_id: &UserId) -> Result<i64, Error> {
        let user = require_user(
            self.users.find_by_id(user_id).await.map_err(map_user_error)?,
            user_id,
        )?;
        Ok(user.points)
    }
}
