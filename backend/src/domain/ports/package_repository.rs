//! Port for package persistence adapters.
//!
//! Same compare-and-set contract as the user port: the caller bumps the
//! revision and passes the one it read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::package::{DateCriteria, Package, PackageId};

/// Persistence errors raised by package repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackageStoreError {
    /// Repository connection could not be established.
    #[error("package store connection failed: {message}")]
    Connection {
        /// Adapter-specific description.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("package store query failed: {message}")]
    Query {
        /// Adapter-specific description.
        message: String,
    },
    /// Compare-and-set failed against a stale revision.
    #[error("package revision mismatch: expected {expected}, found {actual}")]
    RevisionMismatch {
        /// Revision the caller read.
        expected: u32,
        /// Revision currently stored.
        actual: u32,
    },
}

/// Port for package storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// Insert a new package record.
    async fn insert(&self, package: &Package) -> Result<(), PackageStoreError>;

    /// Fetch a package by identifier.
    async fn find_by_id(&self, id: &PackageId) -> Result<Option<Package>, PackageStoreError>;

    /// Compare-and-set save; see [`PackageStoreError::RevisionMismatch`].
    async fn save(&self, package: &Package, expected_revision: u32)
        -> Result<(), PackageStoreError>;

    /// All packages with a non-null assignee.
    async fn find_all_with_delivery_man(&self) -> Result<Vec<Package>, PackageStoreError>;

    /// Day-scoped report query over delivery dates.
    async fn find_by_date_criteria(
        &self,
        criteria: &DateCriteria,
    ) -> Result<Vec<Package>, PackageStoreError>;

    /// Bulk-advance the delivery date of every non-delivered package.
    ///
    /// Returns the number of affected packages.
    async fn advance_delivery_dates(&self, to: DateTime<Utc>) -> Result<u64, PackageStoreError>;
}

/// Fixture implementation for tests that do not exercise package persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePackageRepository;

#[async_trait]
impl PackageRepository for FixturePackageRepository {
    async fn insert(&self, _package: &Package) -> Result<(), PackageStoreError> {
        Ok(())
    }

    async fn find_by_id(&self, _id: &PackageId) -> Result<Option<Package>, PackageStoreError> {
        Ok(None)
    }

    async fn save(
        &self,
        _package: &Package,
        _expected_revision: u32,
    ) -> Result<(), PackageStoreError> {
        Ok(())
    }

    async fn find_all_with_delivery_man(&self) -> Result<Vec<Package>, PackageStoreError> {
        Ok(Vec::new())
    }

    async fn find_by_date_criteria(
        &self,
        _criteria: &DateCriteria,
    ) -> Result<Vec<Package>, PackageStoreError> {
        Ok(Vec::new())
    }

    async fn advance_delivery_dates(&self, _to: DateTime<Utc>) -> Result<u64, PackageStoreError> {
        Ok(0)
    }
}
