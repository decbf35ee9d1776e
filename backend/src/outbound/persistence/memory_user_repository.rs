//! In-memory user document store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::{UserRepository, UserStoreError};
use crate::domain::user::{Email, User, UserId};

#[derive(Default)]
struct UserDocuments {
    by_id: HashMap<UserId, User>,
    email_index: HashMap<String, UserId>,
}

/// User repository backed by an in-process document map.
///
/// The email index enforces uniqueness at the storage layer, so a racing
/// insert that slipped past the directory's pre-check still fails with
/// [`UserStoreError::DuplicateEmail`].
#[derive(Default)]
pub struct MemoryUserRepository {
    inner: RwLock<UserDocuments>,
}

impl MemoryUserRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_key(email: &Email) -> String {
    email.as_ref().to_owned()
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, user: &User) -> Result<(), UserStoreError> {
        let mut inner = self.inner.write().await;
        let key = email_key(&user.email);
        if inner.email_index.contains_key(&key) {
            return Err(UserStoreError::DuplicateEmail { email: key });
        }
        if inner.by_id.contains_key(&user.id) {
            return Err(UserStoreError::Query {
                message: format!("user document already exists: {}", user.id),
            });
        }
        inner.email_index.insert(key, user.id);
        inner.by_id.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserStoreError> {
        Ok(self.inner.read().await.by_id.get(id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, UserStoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .email_index
            .get(email.as_ref())
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn save(&self, user: &User, expected_revision: u32) -> Result<(), UserStoreError> {
        let mut inner = self.inner.write().await;
        let Some(current) = inner.by_id.get(&user.id) else {
            return Err(UserStoreError::Query {
                message: format!("user document missing: {}", user.id),
            });
        };
        if current.revision != expected_revision {
            return Err(UserStoreError::RevisionMismatch {
                expected: expected_revision,
                actual: current.revision,
            });
        }
        let old_key = email_key(&current.email);
        let new_key = email_key(&user.email);
        if new_key != old_key {
            if let Some(owner) = inner.email_index.get(&new_key) {
                if *owner != user.id {
                    return Err(UserStoreError::DuplicateEmail { email: new_key });
                }
            }
            inner.email_index.remove(&old_key);
            inner.email_index.insert(new_key, user.id);
        }
        inner.by_id.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_with_assigned_packages(&self) -> Result<Vec<User>, UserStoreError> {
        let inner = self.inner.read().await;
        let mut holders: Vec<User> = inner
            .by_id
            .values()
            .filter(|user| !user.assigned_packages.is_empty())
            .cloned()
            .collect();
        holders.sort_by_key(|user| user.id);
        Ok(holders)
    }

    async fn remove(&self, id: &UserId) -> Result<bool, UserStoreError> {
        let mut inner = self.inner.write().await;
        match inner.by_id.remove(id) {
            Some(user) => {
                inner.email_index.remove(user.email.as_ref());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_fixtures::user_with_id;

    #[tokio::test]
    async fn save_rejects_a_stale_revision() {
        let store = MemoryUserRepository::new();
        let user = user_with_id(UserId::random());
        store.insert(&user).await.expect("insert");

        let mut first = user.clone();
        first.points = 10;
        first.revision = 2;
        store.save(&first, 1).await.expect("first save");

        let mut second = user.clone();
        second.points = -10;
        second.revision = 2;
        let err = store.save(&second, 1).await.expect_err("stale save");
        assert_eq!(
            err,
            UserStoreError::RevisionMismatch {
                expected: 1,
                actual: 2,
            }
        );
        let stored = store
            .find_by_id(&user.id)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.points, 10);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_at_the_index() {
        let store = MemoryUserRepository::new();
        let first = user_with_id(UserId::random());
        store.insert(&first).await.expect("insert");

        let mut second = user_with_id(UserId::random());
        second.email = first.email.clone();
        let err = store.insert(&second).await.expect_err("duplicate");
        assert!(matches!(err, UserStoreError::DuplicateEmail { .. }));
    }

    #[tokio::test]
    async fn email_index_follows_an_email_change() {
        let store = MemoryUserRepository::new();
        let user = user_with_id(UserId::random());
        let old_email = user.email.clone();
        store.insert(&user).await.expect("insert");

        let mut renamed = user.clone();
        renamed.email = Email::new("renamed@example.com").expect("email");
        renamed.revision = 2;
        store.save(&renamed, 1).await.expect("save");

        assert!(store
            .find_by_email(&old_email)
            .await
            .expect("lookup")
            .is_none());
        assert!(store
            .find_by_email(&renamed.email)
            .await
            .expect("lookup")
            .is_some());
    }
}
