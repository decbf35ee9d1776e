//! Port for user persistence adapters.
//!
//! Saves are compare-and-set on the record revision: the caller sets the new
//! revision on the entity and passes the revision it read; the adapter
//! rejects stale writes with [`UserStoreError::RevisionMismatch`] so services
//! can retry the read-modify-write cycle without losing updates.

use async_trait::async_trait;

use crate::domain::user::{Email, User, UserId};

/// Persistence errors raised by user repository adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserStoreError {
    /// Repository connection could not be established.
    #[error("user store connection failed: {message}")]
    Connection {
        /// Adapter-specific description.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("user store query failed: {message}")]
    Query {
        /// Adapter-specific description.
        message: String,
    },
    /// Compare-and-set failed against a stale revision.
    #[error("user revision mismatch: expected {expected}, found {actual}")]
    RevisionMismatch {
        /// Revision the caller read.
        expected: u32,
        /// Revision currently stored.
        actual: u32,
    },
    /// The unique email index rejected an insert or update.
    #[error("email already registered: {email}")]
    DuplicateEmail {
        /// The conflicting normalised email.
        email: String,
    },
}

/// Port for user storage and retrieval.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; the unique email index is enforced here.
    async fn insert(&self, user: &User) -> Result<(), UserStoreError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError>;

    /// Fetch a user by normalised email.
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserStoreError>;

    /// Compare-and-set save.
    ///
    /// `user.revision` must already carry the new value; `expected_revision`
    /// is the revision the caller read. A stale write fails with
    /// [`UserStoreError::RevisionMismatch`].
    async fn save(&self, user: &User, expected_revision: u32) -> Result<(), UserStoreError>;

    /// All users with a non-empty assigned-package list.
    async fn find_with_assigned_packages(&self) -> Result<Vec<User>, UserStoreError>;

    /// Remove a user record. Returns whether a record existed.
    async fn remove(&self, id: &UserId) -> Result<bool, UserStoreError>;
}

/// Fixture implementation for tests that do not exercise user persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUserRepository;

#[async_trait]
impl UserRepository for FixtureUserRepository {
    async fn insert(&self, _user: &User) -> Result<(), UserStoreError> {
        Ok(())
    }

    async fn find_by_id(&self, _id: &UserId) -> Result<Option<User>, UserStoreError> {
        Ok(None)
    }

    async fn find_by_email(&self, _email: &Email) -> Result<Option<User>, UserStoreError> {
        Ok(None)
    }

    async fn save(&self, _user: &User, _expected_revision: u32) -> Result<(), UserStoreError> {
        Ok(())
    }

    async fn find_with_assigned_packages(&self) -> Result<Vec<User>, UserStoreError> {
        Ok(Vec::new())
    }

    async fn remove(&self, _id: &UserId) -> Result<bool, UserStoreError> {
        Ok(false)
    }
}
