//! Daily reset sweep.
//!
//! Releases every assigned package back to `Available`, advances the
//! delivery dates of the remainder, and clears user-side assignment lists.
//! Every entity is processed independently: one failure is logged and
//! counted, never allowed to abort the sweep. The job is re-entrant — a
//! double fire finds nothing left to release and writes nothing.

use std::fmt;
use std::sync::Arc;

use mockable::Clock;
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use super::audit::{actions, ActorRef, EntityType, NewAuditEntry};
use super::ports::{AuditLogRepository, PackageRepository, UserRepository, UserStoreError};
use super::registry::{map_package_error, PackageRegistry};
use super::Error;

/// What fired the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResetTrigger {
    /// The daily scheduler tick.
    Scheduled,
    /// The operational trigger endpoint.
    Manual,
}

impl fmt::Display for ResetTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
        })
    }
}

/// Counters reported by a completed sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetSummary {
    /// Packages forced back to `Available`.
    pub released: u64,
    /// Packages whose delivery date was bulk-advanced.
    pub advanced: u64,
    /// Users whose assignment list was cleared.
    pub users_cleared: u64,
    /// Entities that failed and were skipped.
    pub failures: u64,
}

/// The scheduled reset job.
pub struct DailyResetJob<P, U> {
    registry: Arc<PackageRegistry<P, U>>,
    packages: Arc<P>,
    users: Arc<U>,
    audit: Arc<dyn AuditLogRepository>,
    clock: Arc<dyn Clock>,
}

impl<P, U> DailyResetJob<P, U> {
    /// Create a job over the registry and the stores it sweeps.
    pub fn new(
        registry: Arc<PackageRegistry<P, U>>,
        packages: Arc<P>,
        users: Arc<U>,
        audit: Arc<dyn AuditLogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            packages,
            users,
            audit,
            clock,
        }
    }
}

impl<P, U> DailyResetJob<P, U>
where
    P: PackageRepository,
    U: UserRepository,
{
    /// Run the sweep. Infallible by contract: failures are counted and
    /// logged, and the remaining entities are still processed.
    pub async fn run(&self, trigger: ResetTrigger) -> ResetSummary {
        let now = self.clock.utc();
        let mut summary = ResetSummary::default();
        info!(%trigger, "daily reset sweep starting");

        let assigned = match self.registry.find_all_with_delivery_man().await {
            Ok(packages) => packages,
            Err(err) => {
                error!(error = %err, "reset sweep could not list assigned packages");
                summary.failures += 1;
                return summary;
            }
        };
        for package in &assigned {
            match self.registry.release_to_available(&package.id, now).await {
                Ok(true) => summary.released += 1,
                // Claimed state changed mid-sweep; nothing left to release.
                Ok(false) => {}
                Err(err) => {
                    warn!(package_id = %package.id, error = %err, "package release failed");
                    summary.failures += 1;
                }
            }
        }

        match self.packages.advance_delivery_dates(now).await {
            Ok(advanced) => {
                summary.advanced = advanced;
                let entry = NewAuditEntry {
                    timestamp: now,
                    action: actions::PACKAGE_RESET_DATE_ADVANCE.to_owned(),
                    entity_type: EntityType::Package,
                    entity_id: "bulk".to_owned(),
                    changes: json!({ "advanced": advanced, "to": now, "trigger": trigger }),
                    performed_by: ActorRef::System,
                };
                if let Err(err) = self.audit.append(entry).await {
                    warn!(error = %err, "date-advance audit entry failed");
                }
            }
            Err(err) => {
                let err = map_package_error(err);
                warn!(error = %err, "bulk delivery-date advance failed");
                summary.failures += 1;
            }
        }

        match self.clear_assignment_lists().await {
            Ok((cleared, failures)) => {
                summary.users_cleared = cleared;
                summary.failures += failures;
            }
            Err(err) => {
                error!(error = %err, "reset sweep could not list users with assignments");
                summary.failures += 1;
            }
        }

        info!(
            %trigger,
            released = summary.released,
            advanced = summary.advanced,
            users_cleared = summary.users_cleared,
            failures = summary.failures,
            "daily reset sweep finished"
        );
        summary
    }

    async fn clear_assignment_lists(&self) -> Result<(u64, u64), Error> {
        let holders = self
            .users
            .find_with_assigned_packages()
            .await
            .map_err(super::audit::map_user_error)?;
        let mut cleared = 0;
        let mut failures = 0;
        for holder in &holders {
            let mut current = holder.clone();
            loop {
                if current.assigned_packages.is_empty() {
                    break;
                }
                let mut updated = current.clone();
                updated.assigned_packages.clear();
                updated.revision = current.revision + 1;
                match self.users.save(&updated, current.revision).await {
                    Ok(()) => {
                        cleared += 1;
                        break;
                    }
                    Err(UserStoreError::RevisionMismatch { .. }) => {
                        match self.users.find_by_id(&holder.id).await {
                            Ok(Some(fresh)) => current = fresh,
                            Ok(None) => break,
                            Err(err) => {
                                warn!(user_id = %holder.id, error = %err, "assignment clear failed");
                                failures += 1;
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        warn!(user_id = %holder.id, error = %err, "assignment clear failed");
                        failures += 1;
                        break;
                    }
                }
            }
        }
        Ok((cleared, failures))
    }
}
