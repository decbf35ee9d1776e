//! Driving port for the rewards ledger.
//!
//! Other services (package registry, declaration gate) depend on this trait
//! rather than on the concrete ledger so their tests can observe and stub the
//! point side effects.

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::audit::ActorRef;
use crate::domain::user::UserId;
use crate::domain::Error;

/// Balance snapshot returned by every ledger mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReceipt {
    /// The affected user.
    pub user_id: UserId,
    /// Balance after the mutation. May be negative.
    pub points: i64,
    /// Streak counter after the mutation.
    pub consecutive_deliveries: u32,
}

/// Point and streak bookkeeping operations.
///
/// Every mutation pairs with exactly one audit entry. The deltas are fixed
/// business constants, not configuration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RewardsCommand: Send + Sync {
    /// +10 to the balance, streak incremented.
    async fn add_points_for_delivery(&self, user_id: &UserId) -> Result<LedgerReceipt, Error>;

    /// −10 to the balance, streak reset to 0.
    async fn subtract_points_for_cancellation(
        &self,
        user_id: &UserId,
    ) -> Result<LedgerReceipt, Error>;

    /// −20 per undelivered package, streak reset to 0, attributed to the
    /// administrator who applied it.
    async fn subtract_points_for_undelivered_packages(
        &self,
        user_id: &UserId,
        packages_count: u32,
        performed_by: ActorRef,
    ) -> Result<LedgerReceipt, Error>;

    /// −100 flat after a negative fitness declaration, streak reset to 0.
    async fn subtract_points_for_negative_declaration(
        &self,
        user_id: &UserId,
    ) -> Result<LedgerReceipt, Error>;

    /// Streak reset to 0 without touching the balance.
    async fn reset_consecutive_deliveries(
        &self,
        user_id: &UserId,
    ) -> Result<LedgerReceipt, Error>;

    /// Administrative absolute override; no delta semantics, no floor.
    async fn set_points(
        &self,
        user_id: &UserId,
        points: i64,
        performed_by: ActorRef,
    ) -> Result<LedgerReceipt, Error>;

    /// Read the current balance.
    async fn get_user_points(&self, user_id: &UserId) -> Result<i64, Error>;
}
