//! Port for fitness-declaration persistence adapters.

use async_trait::async_trait;

use crate::domain::declaration::LegalDeclaration;
use crate::domain::user::UserId;

/// Persistence errors raised by declaration adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclarationStoreError {
    /// Store connection could not be established.
    #[error("declaration store connection failed: {message}")]
    Connection {
        /// Adapter-specific description.
        message: String,
    },
    /// Query or insert failed during execution.
    #[error("declaration store query failed: {message}")]
    Query {
        /// Adapter-specific description.
        message: String,
    },
}

/// Port for declaration storage. Records are append-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeclarationRepository: Send + Sync {
    /// Insert a new declaration record.
    async fn insert(&self, declaration: &LegalDeclaration) -> Result<(), DeclarationStoreError>;

    /// All declarations submitted by a user, oldest first.
    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LegalDeclaration>, DeclarationStoreError>;

    /// Every stored declaration, oldest first.
    async fn find_all(&self) -> Result<Vec<LegalDeclaration>, DeclarationStoreError>;
}

/// Fixture implementation for tests that ignore stored declarations.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDeclarationRepository;

#[async_trait]
impl DeclarationRepository for FixtureDeclarationRepository {
    async fn insert(&self, _declaration: &LegalDeclaration) -> Result<(), DeclarationStoreError> {
        Ok(())
    }

    async fn find_by_user(
        &self,
        _user_id: &UserId,
    ) -> Result<Vec<LegalDeclaration>, DeclarationStoreError> {
        Ok(Vec::new())
    }

    async fn find_all(&self) -> Result<Vec<LegalDeclaration>, DeclarationStoreError> {
        Ok(Vec::new())
    }
}
