//! Package registry: lifecycle state machine and assignment bookkeeping.
//!
//! Interactive transitions only move forward through
//! `Available → Pending → OnTheWay → Delivered`; the daily reset job uses the
//! forced [`PackageRegistry::release_to_available`] edge. A successful
//! delivery credits the assignee through the [`RewardsCommand`] port, so the
//! point side effect stays observable in tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::{json, Value};
use tracing::warn;

use super::audit::{actions, map_user_error, ActorRef, EntityType, NewAuditEntry};
use super::package::{DateCriteria, NewPackage, Package, PackageId, PackageState};
use super::ports::{
    AuditLogRepository, LedgerReceipt, PackageRepository, PackageStoreError, RewardsCommand,
    UserRepository, UserStoreError,
};
use super::user::{require_user, UserId};
use super::Error;

/// Map package store failures onto domain error codes.
pub(crate) fn map_package_error(err: PackageStoreError) -> Error {
    match err {
        PackageStoreError::Connection { message } => Error::service_unavailable(message),
        PackageStoreError::Query { message } => Error::internal(message),
        PackageStoreError::RevisionMismatch { expected, actual } => Error::conflict(format!(
            "package modified concurrently: expected revision {expected}, found {actual}"
        )),
    }
}

/// The package lifecycle service.
#[derive(Clone)]
pub struct PackageRegistry<P, U> {
    packages: Arc<P>,
    users: Arc<U>,
    rewards: Arc<dyn RewardsCommand>,
    audit: Arc<dyn AuditLogRepository>,
    clock: Arc<dyn Clock>,
}

impl<P, U> PackageRegistry<P, U> {
    /// Create a registry over the given stores and collaborators.
    pub fn new(
        packages: Arc<P>,
        users: Arc<U>,
        rewards: Arc<dyn RewardsCommand>,
        audit: Arc<dyn AuditLogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            packages,
            users,
            rewards,
            audit,
            clock,
        }
    }
}

impl<P, U> PackageRegistry<P, U>
where
    P: PackageRepository,
    U: UserRepository,
{
    /// Create a new package in the `Available` state.
    pub async fn create_package(
        &self,
        new: NewPackage,
        performed_by: ActorRef,
    ) -> Result<Package, Error> {
        let package = Package {
            id: PackageId::random(),
            description: new.description,
            address: new.address,
            weight_grams: new.weight_grams,
            delivery_date: new.delivery_date,
            state: PackageState::Available,
            delivery_man: None,
            revision: 1,
        };
        self.packages
            .insert(&package)
            .await
            .map_err(map_package_error)?;
        self.record(
            actions::PACKAGE_STATE_CHANGE,
            &package.id,
            performed_by,
            json!({ "state": { "from": Value::Null, "to": PackageState::Available } }),
        )
        .await;
        Ok(package)
    }

    /// Assign an available package to a delivery person.
    ///
    /// The target user's assignment list must already be non-empty. The check
    /// reads inverted but is the deployed policy; see the service
    /// documentation before changing it.
    pub async fn assign(
        &self,
        package_id: &PackageId,
        user_id: &UserId,
        performed_by: ActorRef,
    ) -> Result<Package, Error> {
        let package = self.find_by_id(package_id).await?;
        if package.state != PackageState::Available {
            return Err(Error::invalid_state(format!(
                "package {package_id} is {}, not available",
                package.state
            )));
        }
        let user = require_user(
            self.users.find_by_id(user_id).await.map_err(map_user_error)?,
            user_id,
        )?;
        if user.assigned_packages.is_empty() {
            return Err(Error::invalid_state(format!(
                "user {user_id} has no assignment list to extend"
            )));
        }

        let updated = self
            .transition(package_id, PackageState::Pending, |package| {
                package.delivery_man = Some(*user_id);
            })
            .await?;
        self.push_assignment(user_id, package_id).await?;

        self.record(
            actions::PACKAGE_ASSIGN,
            package_id,
            performed_by,
            json!({ "deliveryMan": { "from": Value::Null, "to": user_id } }),
        )
        .await;
        self.record(
            actions::PACKAGE_STATE_CHANGE,
            package_id,
            performed_by,
            json!({ "state": { "from": PackageState::Available, "to": PackageState::Pending } }),
        )
        .await;
        Ok(updated)
    }

    /// Pick up an assigned package: `Pending → OnTheWay`, assignee only.
    pub async fn start_delivery(
        &self,
        package_id: &PackageId,
        user_id: &UserId,
    ) -> Result<Package, Error> {
        let package = self.find_by_id(package_id).await?;
        self.require_assignee(&package, user_id)?;
        let from = package.state;
        let updated = self
            .transition(package_id, PackageState::OnTheWay, |_| {})
            .await?;
        self.record(
            actions::PACKAGE_STATE_CHANGE,
            package_id,
            ActorRef::User(*user_id),
            json!({ "state": { "from": from, "to": PackageState::OnTheWay } }),
        )
        .await;
        Ok(updated)
    }

    /// Complete a delivery and credit the assignee.
    ///
    /// The point credit goes through the rewards port after the state commit;
    /// a degraded ledger audit propagates from there.
    pub async fn mark_delivered(
        &self,
        package_id: &PackageId,
        user_id: &UserId,
    ) -> Result<(Package, LedgerReceipt), Error> {
        let package = self.find_by_id(package_id).await?;
        self.require_assignee(&package, user_id)?;
        let from = package.state;
        let updated = self
            .transition(package_id, PackageState::Delivered, |_| {})
            .await?;
        self.record(
            actions::PACKAGE_STATE_CHANGE,
            package_id,
            ActorRef::User(*user_id),
            json!({ "state": { "from": from, "to": PackageState::Delivered } }),
        )
        .await;
        let receipt = self.rewards.add_points_for_delivery(user_id).await?;
        Ok((updated, receipt))
    }

    /// Forced reset edge, used only by the daily reset job.
    ///
    /// Clears the assignee, resets the delivery date to `now`, and writes two
    /// audit entries as the system actor. Returns `false` without writing
    /// anything when the package was already released by a racing sweep.
    pub async fn release_to_available(
        &self,
        package_id: &PackageId,
        now: DateTime<Utc>,
    ) -> Result<bool, Error> {
        loop {
            let current = self.find_by_id(package_id).await?;
            let Some(assignee) = current.delivery_man else {
                return Ok(false);
            };
            let from = current.state;
            let mut updated = current.clone();
            updated.state = PackageState::Available;
            updated.delivery_man = None;
            updated.delivery_date = now;
            updated.revision = current.revision + 1;
            match self.packages.save(&updated, current.revision).await {
                Ok(()) => {
                    self.record(
                        actions::PACKAGE_STATE_CHANGE,
                        package_id,
                        ActorRef::System,
                        json!({
                            "state": { "from": from, "to": PackageState::Available },
                            "deliveryMan": { "from": assignee, "to": Value::Null },
                        }),
                    )
                    .await;
                    self.record(
                        actions::PACKAGE_DELIVERY_DATE_CHANGE,
                        package_id,
                        ActorRef::System,
                        json!({
                            "deliveryDate": { "from": current.delivery_date, "to": now },
                        }),
                    )
                    .await;
                    return Ok(true);
                }
                Err(PackageStoreError::RevisionMismatch { .. }) => continue,
                Err(err) => return Err(map_package_error(err)),
            }
        }
    }

    /// Fetch a package, failing with `NotFound` when absent.
    pub async fn find_by_id(&self, package_id: &PackageId) -> Result<Package, Error> {
        self.packages
            .find_by_id(package_id)
            .await
            .map_err(map_package_error)?
            .ok_or_else(|| Error::not_found(format!("package not found: {package_id}")))
    }

    /// All packages with a non-null assignee.
    pub async fn find_all_with_delivery_man(&self) -> Result<Vec<Package>, Error> {
        self.packages
            .find_all_with_delivery_man()
            .await
            .map_err(map_package_error)
    }

    /// Day-scoped report query.
    pub async fn find_by_date_criteria(
        &self,
        criteria: &DateCriteria,
    ) -> Result<Vec<Package>, Error> {
        self.packages
            .find_by_date_criteria(criteria)
            .await
            .map_err(map_package_error)
    }

    fn require_assignee(&self, package: &Package, user_id: &UserId) -> Result<(), Error> {
        if package.delivery_man != Some(*user_id) {
            return Err(Error::invalid_state(format!(
                "package {} is not assigned to user {user_id}",
                package.id
            )));
        }
        Ok(())
    }

    /// Compare-and-set state transition, validated against the forward
    /// matrix. Retries on stale revisions; a racing transition that makes the
    /// move illegal fails with `InvalidState` instead of looping.
    async fn transition(
        &self,
        package_id: &PackageId,
        next: PackageState,
        apply: impl Fn(&mut Package),
    ) -> Result<Package, Error> {
        loop {
            let current = self.find_by_id(package_id).await?;
            if !current.state.allows(next) {
                return Err(Error::invalid_state(format!(
                    "package {package_id} cannot move from {} to {next}",
                    current.state
                )));
            }
            let mut updated = current.clone();
            updated.state = next;
            apply(&mut updated);
            updated.revision = current.revision + 1;
            match self.packages.save(&updated, current.revision).await {
                Ok(()) => return Ok(updated),
                Err(PackageStoreError::RevisionMismatch { .. }) => continue,
                Err(err) => return Err(map_package_error(err)),
            }
        }
    }

    async fn push_assignment(
        &self,
        user_id: &UserId,
        package_id: &PackageId,
    ) -> Result<(), Error> {
        loop {
            let current = require_user(
                self.users.find_by_id(user_id).await.map_err(map_user_error)?,
                user_id,
            )?;
            let mut updated = current.clone();
            if !updated.assigned_packages.contains(package_id) {
                updated.assigned_packages.push(*package_id);
            }
            updated.revision = current.revision + 1;
            match self.users.save(&updated, current.revision).await {
                Ok(()) => return Ok(()),
                Err(UserStoreError::RevisionMismatch { .. }) => continue,
                Err(err) => return Err(map_user_error(err)),
            }
        }
    }

    async fn record(
        &self,
        action: &str,
        package_id: &PackageId,
        performed_by: ActorRef,
        changes: Value,
    ) {
        let entry = NewAuditEntry {
            timestamp: self.clock.utc(),
            action: action.to_owned(),
            entity_type: EntityType::Package,
            entity_id: package_id.to_string(),
            changes,
            performed_by,
        };
        if let Err(err) = self.audit.append(entry).await {
            warn!(action, package_id = %package_id, error = %err, "package audit entry failed");
        }
    }
}
