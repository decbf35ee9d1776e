//! Read-only reporting over the audit trail and the package registry.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::audit::{actions, ActionTally, AuditTrail, EntityActionRow};
use super::package::{DateCriteria, Package};
use super::ports::{AuditLogRepository, PackageRepository, UserRepository};
use super::registry::PackageRegistry;
use super::Error;

/// Action codes the headcount report classifies on.
const HEADCOUNT_ACTIONS: [&str; 2] = [actions::USER_ACTIVATE, actions::USER_DEACTIVATE];

/// Administrative reports.
pub struct ReportingEngine<A, U, P> {
    trail: Arc<AuditTrail<A, U>>,
    registry: Arc<PackageRegistry<P, U>>,
}

impl<A, U, P> ReportingEngine<A, U, P> {
    /// Create a reporting engine over the trail and the registry.
    pub fn new(trail: Arc<AuditTrail<A, U>>, registry: Arc<PackageRegistry<P, U>>) -> Self {
        Self { trail, registry }
    }
}

impl<A, U, P> ReportingEngine<A, U, P>
where
    A: AuditLogRepository,
    U: UserRepository,
    P: PackageRepository,
{
    /// Active/inactive headcount within the window.
    ///
    /// A user counts under whichever of activate/deactivate their latest
    /// entry in the window carries.
    pub async fn headcount(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ActionTally>, Error> {
        validate_window(start, end)?;
        self.trail
            .latest_state_transition_per_entity(start, end, &HEADCOUNT_ACTIONS)
            .await
    }

    /// Per-user drill-down of the headcount classification.
    pub async fn headcount_detail(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EntityActionRow>, Error> {
        validate_window(start, end)?;
        self.trail
            .state_detail_per_entity(start, end, &HEADCOUNT_ACTIONS)
            .await
    }

    /// Day-scoped package report.
    pub async fn packages_report(&self, criteria: &DateCriteria) -> Result<Vec<Package>, Error> {
        if !(1..=12).contains(&criteria.month) || !(1..=31).contains(&criteria.day) {
            return Err(Error::invalid_request(format!(
                "invalid report date: {}-{}-{}",
                criteria.year, criteria.month, criteria.day
            )));
        }
        self.registry.find_by_date_criteria(criteria).await
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), Error> {
    if start > end {
        return Err(Error::invalid_request(format!(
            "report window starts after it ends: {start} > {end}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{
        MockAuditLogRepository, MockPackageRepository, MockRewardsCommand, MockUserRepository,
    };
    use crate::domain::ErrorCode;
    use chrono::TimeDelta;

    fn engine(
        audit: MockAuditLogRepository,
        packages: MockPackageRepository,
    ) -> ReportingEngine<MockAuditLogRepository, MockUserRepository, MockPackageRepository> {
        let users = Arc::new(MockUserRepository::new());
        let audit = Arc::new(audit);
        let clock: Arc<dyn mockable::Clock> = Arc::new(mockable::DefaultClock);
        let trail = Arc::new(AuditTrail::new(Arc::clone(&audit), Arc::clone(&users)));
        let registry = Arc::new(PackageRegistry::new(
            Arc::new(packages),
            users,
            Arc::new(MockRewardsCommand::new()),
            audit,
            clock,
        ));
        ReportingEngine::new(trail, registry)
    }

    #[tokio::test]
    async fn headcount_filters_on_the_activation_actions() {
        let mut audit = MockAuditLogRepository::new();
        audit
            .expect_find_range()
            .withf(|_, _, actions_filter| {
                actions_filter
                    == [
                        actions::USER_ACTIVATE.to_owned(),
                        actions::USER_DEACTIVATE.to_owned(),
                    ]
            })
            .times(1)
            .return_once(|_, _, _| Ok(Vec::new()));

        let now = Utc::now();
        let tallies = engine(audit, MockPackageRepository::new())
            .headcount(now - TimeDelta::days(1), now)
            .await
            .expect("headcount");
        assert!(tallies.is_empty());
    }

    #[tokio::test]
    async fn inverted_window_is_rejected() {
        let now = Utc::now();
        let err = engine(MockAuditLogRepository::new(), MockPackageRepository::new())
            .headcount(now, now - TimeDelta::days(1))
            .await
            .expect_err("inverted window");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn packages_report_rejects_impossible_dates() {
        let criteria = DateCriteria {
            year: 2026,
            month: 13,
            day: 1,
            delivery_man: None,
            include_all: false,
        };
        let err = engine(MockAuditLogRepository::new(), MockPackageRepository::new())
            .packages_report(&criteria)
            .await
            .expect_err("invalid month");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
