//! In-memory package document store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tokio::sync::RwLock;

use crate::domain::package::{DateCriteria, Package, PackageId, PackageState};
use crate::domain::ports::{PackageRepository, PackageStoreError};

/// Package repository backed by an in-process document map.
#[derive(Default)]
pub struct MemoryPackageRepository {
    inner: RwLock<HashMap<PackageId, Package>>,
}

impl MemoryPackageRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn day_window(criteria: &DateCriteria) -> Result<(DateTime<Utc>, DateTime<Utc>), PackageStoreError> {
    let start = Utc
        .with_ymd_and_hms(criteria.year, criteria.month, criteria.day, 0, 0, 0)
        .single()
        .ok_or_else(|| PackageStoreError::Query {
            message: format!(
                "invalid report date: {}-{}-{}",
                criteria.year, criteria.month, criteria.day
            ),
        })?;
    Ok((start, start + TimeDelta::days(1)))
}

fn matches(package: &Package, criteria: &DateCriteria, window: (DateTime<Utc>, DateTime<Utc>)) -> bool {
    let (start, end) = window;
    if package.delivery_date < start || package.delivery_date >= end {
        return false;
    }
    if let Some(assignee) = criteria.delivery_man {
        if package.delivery_man != Some(assignee) {
            return false;
        }
    }
    criteria.include_all || package.state == PackageState::Delivered
}

#[async_trait]
impl PackageRepository for MemoryPackageRepository {
    async fn insert(&self, package: &Package) -> Result<(), PackageStoreError> {
        let mut inner = self.inner.write().await;
        if inner.contains_key(&package.id) {
            return Err(PackageStoreError::Query {
                message: format!("package document already exists: {}", package.id),
            });
        }
        inner.insert(package.id, package.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PackageId) -> Result<Option<Package>, PackageStoreError> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn save(
        &self,
        package: &Package,
        expected_revision: u32,
    ) -> Result<(), PackageStoreError> {
        let mut inner = self.inner.write().await;
        let Some(current) = inner.get(&package.id) else {
            return Err(PackageStoreError::Query {
                message: format!("package document missing: {}", package.id),
            });
        };
        if current.revision != expected_revision {
            return Err(PackageStoreError::RevisionMismatch {
                expected: expected_revision,
                actual: current.revision,
            });
        }
        inner.insert(package.id, package.clone());
        Ok(())
    }

    async fn find_all_with_delivery_man(&self) -> Result<Vec<Package>, PackageStoreError> {
        let inner = self.inner.read().await;
        let mut assigned: Vec<Package> = inner
            .values()
            .filter(|package| package.delivery_man.is_some())
            .cloned()
            .collect();
        assigned.sort_by_key(|package| package.id);
        Ok(assigned)
    }

    async fn find_by_date_criteria(
        &self,
        criteria: &DateCriteria,
    ) -> Result<Vec<Package>, PackageStoreError> {
        let window = day_window(criteria)?;
        let inner = self.inner.read().await;
        let mut matched: Vec<Package> = inner
            .values()
            .filter(|package| matches(package, criteria, window))
            .cloned()
            .collect();
        matched.sort_by_key(|package| package.id);
        Ok(matched)
    }

    async fn advance_delivery_dates(&self, to: DateTime<Utc>) -> Result<u64, PackageStoreError> {
        let mut inner = self.inner.write().await;
        let mut advanced = 0;
        for package in inner.values_mut() {
            if package.state != PackageState::Delivered && package.delivery_date < to {
                package.delivery_date = to;
                package.revision += 1;
                advanced += 1;
            }
        }
        Ok(advanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::package_with_id;
    use crate::domain::user::UserId;

    fn dated(date: DateTime<Utc>, state: PackageState, assignee: Option<UserId>) -> Package {
        let mut package = package_with_id(PackageId::random());
        package.delivery_date = date;
        package.state = state;
        package.delivery_man = assignee;
        package
    }

    #[tokio::test]
    async fn date_criteria_defaults_to_delivered_packages_on_the_day() {
        let store = MemoryPackageRepository::new();
        let day = Utc.with_ymd_and_hms(2026, 8, 20, 14, 30, 0).single().expect("date");
        let delivered = dated(day, PackageState::Delivered, None);
        let pending = dated(day, PackageState::Pending, None);
        let other_day = dated(day + TimeDelta::days(2), PackageState::Delivered, None);
        for package in [&delivered, &pending, &other_day] {
            store.insert(package).await.expect("insert");
        }

        let criteria = DateCriteria {
            year: 2026,
            month: 8,
            day: 20,
            delivery_man: None,
            include_all: false,
        };
        let matched = store.find_by_date_criteria(&criteria).await.expect("query");
        assert_eq!(matched, vec![delivered.clone()]);

        let widened = DateCriteria {
            include_all: true,
            ..criteria
        };
        let matched = store.find_by_date_criteria(&widened).await.expect("query");
        assert_eq!(matched.len(), 2);
    }

    #[tokio::test]
    async fn date_criteria_narrows_to_the_assignee() {
        let store = MemoryPackageRepository::new();
        let day = Utc.with_ymd_and_hms(2026, 8, 20, 9, 0, 0).single().expect("date");
        let courier = UserId::random();
        let theirs = dated(day, PackageState::Delivered, Some(courier));
        let someone_elses = dated(day, PackageState::Delivered, Some(UserId::random()));
        for package in [&theirs, &someone_elses] {
            store.insert(package).await.expect("insert");
        }

        let criteria = DateCriteria {
            year: 2026,
            month: 8,
            day: 20,
            delivery_man: Some(courier),
            include_all: false,
        };
        let matched = store.find_by_date_criteria(&criteria).await.expect("query");
        assert_eq!(matched, vec![theirs]);
    }

    #[tokio::test]
    async fn advance_skips_delivered_and_future_dates() {
        let store = MemoryPackageRepository::new();
        let now = Utc::now();
        let stale = dated(now - TimeDelta::days(1), PackageState::Available, None);
        let delivered = dated(now - TimeDelta::days(1), PackageState::Delivered, None);
        let future = dated(now + TimeDelta::days(1), PackageState::Available, None);
        for package in [&stale, &delivered, &future] {
            store.insert(package).await.expect("insert");
        }

        let advanced = store.advance_delivery_dates(now).await.expect("advance");
        assert_eq!(advanced, 1);
        let moved = store
            .find_by_id(&stale.id)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(moved.delivery_date, now);
        assert_eq!(moved.revision, stale.revision + 1);
    }

    #[tokio::test]
    async fn save_rejects_a_stale_revision() {
        let store = MemoryPackageRepository::new();
        let package = package_with_id(PackageId::random());
        store.insert(&package).await.expect("insert");

        let mut updated = package.clone();
        updated.state = PackageState::Pending;
        updated.revision = 2;
        store.save(&updated, 1).await.expect("save");

        let err = store.save(&updated, 1).await.expect_err("stale");
        assert!(matches!(err, PackageStoreError::RevisionMismatch { .. }));
    }
}
