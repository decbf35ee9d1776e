//! In-memory fitness-declaration store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::declaration::LegalDeclaration;
use crate::domain::ports::{DeclarationRepository, DeclarationStoreError};
use crate::domain::user::UserId;

/// Append-only declaration store backed by an in-process vector.
#[derive(Default)]
pub struct MemoryDeclarationRepository {
    inner: RwLock<Vec<LegalDeclaration>>,
}

impl MemoryDeclarationRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeclarationRepository for MemoryDeclarationRepository {
    async fn insert(&self, declaration: &LegalDeclaration) -> Result<(), DeclarationStoreError> {
        self.inner.write().await.push(declaration.clone());
        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<LegalDeclaration>, DeclarationStoreError> {
        Ok(self
            .inner
            .read()
            .await
            .iter()
            .filter(|declaration| declaration.user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<LegalDeclaration>, DeclarationStoreError> {
        Ok(self.inner.read().await.clone())
    }
}
