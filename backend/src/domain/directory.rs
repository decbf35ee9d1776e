//! User directory: registration and account administration.
//!
//! Email normalisation happens here, before any write reaches the store;
//! uniqueness is enforced by the store's unique index and translated to
//! [`ErrorCode::Conflict`](crate::domain::ErrorCode). Directory audit writes
//! are best-effort: a failed entry is logged loudly but does not fail the
//! account change (unlike ledger mutations, which surface `AuditDegraded`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::{json, Value};
use tracing::warn;

use super::audit::{actions, map_user_error, ActorRef, EntityType, NewAuditEntry};
use super::ports::{AuditLogRepository, UserRepository, UserStoreError};
use super::user::{require_user, Email, Lockout, NewUser, User, UserId, UserPatch};
use super::Error;

/// The user directory service.
#[derive(Clone)]
pub struct UserDirectory<U, A> {
    users: Arc<U>,
    audit: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<U, A> UserDirectory<U, A> {
    /// Create a directory over the given stores.
    pub fn new(users: Arc<U>, audit: Arc<A>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            audit,
            clock,
        }
    }
}

impl<U, A> UserDirectory<U, A>
where
    U: UserRepository,
    A: AuditLogRepository,
{
    /// Register a new account.
    ///
    /// The email is normalised first; a duplicate fails with `Conflict` and
    /// leaves the existing record untouched.
    pub async fn register(&self, new: NewUser, performed_by: ActorRef) -> Result<User, Error> {
        let email = Email::new(new.email)?;
        if self
            .users
            .find_by_email(&email)
            .await
            .map_err(map_user_error)?
            .is_some()
        {
            return Err(Error::conflict(format!("email already registered: {email}")));
        }
        let user = User {
            id: UserId::random(),
            name: new.name,
            last_name: new.last_name,
            email,
            password_hash: new.password_hash,
            roles: new.roles,
            active: true,
            points: 0,
            consecutive_deliveries: 0,
            assigned_packages: Vec::new(),
            lockout: None,
            revision: 1,
        };
        // The unique index still guards the insert against a racing register.
        self.users.insert(&user).await.map_err(map_user_error)?;
        self.record(
            actions::USER_REGISTER,
            &user.id,
            performed_by,
            json!({ "email": user.email.as_ref(), "roles": user.roles }),
        )
        .await;
        Ok(user)
    }

    /// Fetch a user, failing with `NotFound` when absent.
    pub async fn find_by_id(&self, user_id: &UserId) -> Result<User, Error> {
        require_user(
            self.users.find_by_id(user_id).await.map_err(map_user_error)?,
            user_id,
        )
    }

    /// Fetch a user by raw email (normalised before the lookup).
    pub async fn find_by_email(&self, raw: &str) -> Result<Option<User>, Error> {
        let email = Email::new(raw)?;
        self.users.find_by_email(&email).await.map_err(map_user_error)
    }

    /// Apply an explicit patch.
    ///
    /// An email change is re-normalised and uniqueness-checked against other
    /// accounts before the save.
    pub async fn update(
        &self,
        user_id: &UserId,
        patch: UserPatch,
        performed_by: ActorRef,
    ) -> Result<User, Error> {
        if patch.is_empty() {
            return Err(Error::invalid_request("patch carries no changes"));
        }
        let new_email = match &patch.email {
            Some(raw) => {
                let email = Email::new(raw.clone())?;
                if let Some(existing) = self
                    .users
                    .find_by_email(&email)
                    .await
                    .map_err(map_user_error)?
                {
                    if existing.id != *user_id {
                        return Err(Error::conflict(format!(
                            "email already registered: {email}"
                        )));
                    }
                }
                Some(email)
            }
            None => None,
        };

        let updated = self
            .mutate(user_id, |user| {
                if let Some(name) = patch.name.clone() {
                    user.name = name;
                }
                if let Some(last_name) = patch.last_name.clone() {
                    user.last_name = last_name;
                }
                if let Some(email) = new_email.clone() {
                    user.email = email;
                }
                if let Some(active) = patch.active {
                    user.active = active;
                }
                if let Some(roles) = patch.roles.clone() {
                    user.roles = roles;
                }
            })
            .await?;
        self.record(
            actions::USER_UPDATE,
            user_id,
            performed_by,
            json!({
                "name": patch.name,
                "lastName": patch.last_name,
                "email": new_email.as_ref().map(Email::as_ref),
                "active": patch.active,
            }),
        )
        .await;
        Ok(updated)
    }

    /// Flip the active flag, recording the activate/deactivate action codes
    /// the headcount report classifies on.
    pub async fn set_active(
        &self,
        user_id: &UserId,
        active: bool,
        performed_by: ActorRef,
    ) -> Result<User, Error> {
        let before = self.find_by_id(user_id).await?;
        let updated = self.mutate(user_id, |user| user.active = active).await?;
        let action = if active {
            actions::USER_ACTIVATE
        } else {
            actions::USER_DEACTIVATE
        };
        self.record(
            action,
            user_id,
            performed_by,
            json!({ "active": { "from": before.active, "to": active } }),
        )
        .await;
        Ok(updated)
    }

    /// Apply a temporary lockout.
    pub async fn apply_lockout(
        &self,
        user_id: &UserId,
        until: DateTime<Utc>,
        reason: &str,
        performed_by: ActorRef,
    ) -> Result<User, Error> {
        let updated = self
            .mutate(user_id, |user| {
                user.lockout = Some(Lockout {
                    until,
                    reason: reason.to_owned(),
                });
            })
            .await?;
        self.record(
            actions::USER_LOCKOUT,
            user_id,
            performed_by,
            json!({ "until": until, "reason": reason }),
        )
        .await;
        Ok(updated)
    }

    /// Explicit admin removal; the only way a user record disappears.
    pub async fn remove(&self, user_id: &UserId, performed_by: ActorRef) -> Result<(), Error> {
        let existed = self.users.remove(user_id).await.map_err(map_user_error)?;
        if !existed {
            return Err(Error::not_found(format!("user not found: {user_id}")));
        }
        self.record(actions::USER_REMOVE, user_id, performed_by, json!({}))
            .await;
        Ok(())
    }

    /// Compare-and-set read-modify-write with retry on stale revisions.
    pub(crate) async fn mutate(
        &self,
        user_id: &UserId,
        apply: impl Fn(&mut User),
    ) -> Result<User, Error> {
        loop {
            let current = require_user(
                self.users.find_by_id(user_id).await.map_err(map_user_error)?,
                user_id,
            )?;
            let mut updated = current.clone();
            apply(&mut updated);
            updated.revision = current.revision + 1;
            match self.users.save(&updated, current.revision).await {
                Ok(()) => return Ok(updated),
                Err(UserStoreError::RevisionMismatch { .. }) => continue,
                Err(err) => return Err(map_user_error(err)),
            }
        }
    }

    async fn record(&self, action: &str, user_id: &UserId, performed_by: ActorRef, changes: Value) {
        let entry = NewAuditEntry {
            timestamp: self.clock.utc(),
            action: action.to_owned(),
            entity_type: EntityType::User,
            entity_id: user_id.to_string(),
            changes,
            performed_by,
        };
        if let Err(err) = self.audit.append(entry).await {
            warn!(action, user_id = %user_id, error = %err, "directory audit entry failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockAuditLogRepository, MockUserRepository};
    use crate::domain::test_fixtures::user_with_id;
    use crate::domain::user::Role;
    use crate::domain::ErrorCode;
    use std::collections::BTreeSet;

    fn directory(
        users: MockUserRepository,
        audit: MockAuditLogRepository,
    ) -> UserDirectory<MockUserRepository, MockAuditLogRepository> {
        UserDirectory::new(
            Arc::new(users),
            Arc::new(audit),
            Arc::new(mockable::DefaultClock),
        )
    }

    fn expect_append_ok(audit: &mut MockAuditLogRepository) {
        audit.expect_append().returning(|entry| {
            Ok(crate::domain::audit::AuditLogEntry {
                sequence: 1,
                timestamp: entry.timestamp,
                action: entry.action,
                entity_type: entry.entity_type,
                entity_id: entry.entity_id,
                changes: entry.changes,
                performed_by: entry.performed_by,
            })
        });
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password_hash: "hash".into(),
            roles: BTreeSet::from([Role::Delivery]),
        }
    }

    #[tokio::test]
    async fn register_normalises_email_and_inserts() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .withf(|email| email.as_ref() == "ada@example.com")
            .times(1)
            .return_once(|_| Ok(None));
        users
            .expect_insert()
            .withf(|user| user.email.as_ref() == "ada@example.com" && user.points == 0)
            .times(1)
            .return_once(|_| Ok(()));
        let mut audit = MockAuditLogRepository::new();
        expect_append_ok(&mut audit);

        let user = directory(users, audit)
            .register(new_user("Ada@Example.COM"), ActorRef::System)
            .await
            .expect("registered");
        assert!(user.active);
        assert_eq!(user.revision, 1);
    }

    #[tokio::test]
    async fn duplicate_email_registration_conflicts() {
        let existing = user_with_id(UserId::random());
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .times(1)
            .return_once(move |_| Ok(Some(existing)));
        users.expect_insert().times(0);
        let audit = MockAuditLogRepository::new();

        let err = directory(users, audit)
            .register(new_user("ada@example.com"), ActorRef::System)
            .await
            .expect_err("conflict");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn racing_insert_translates_unique_index_violation() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().times(1).return_once(|_| Ok(None));
        users.expect_insert().times(1).return_once(|_| {
            Err(UserStoreError::DuplicateEmail {
                email: "ada@example.com".into(),
            })
        });
        let audit = MockAuditLogRepository::new();

        let err = directory(users, audit)
            .register(new_user("ada@example.com"), ActorRef::System)
            .await
            .expect_err("conflict");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn deactivation_writes_the_deactivate_action() {
        let user_id = UserId::random();
        let user = user_with_id(user_id);
        let mut users = MockUserRepository::new();
        let for_lookup = user.clone();
        let for_mutate = user.clone();
        let mut seq = mockall::Sequence::new();
        users
            .expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(move |_| Ok(Some(for_lookup)));
        users
            .expect_find_by_id()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(move |_| Ok(Some(for_mutate)));
        users
            .expect_save()
            .withf(|user, _| !user.active)
            .times(1)
            .return_once(|_, _| Ok(()));

        let mut audit = MockAuditLogRepository::new();
        audit
            .expect_append()
            .withf(|entry| entry.action == actions::USER_DEACTIVATE)
            .times(1)
            .returning(|entry| {
                Ok(crate::domain::audit::AuditLogEntry {
                    sequence: 1,
                    timestamp: entry.timestamp,
                    action: entry.action,
                    entity_type: entry.entity_type,
                    entity_id: entry.entity_id,
                    changes: entry.changes,
                    performed_by: entry.performed_by,
                })
            });

        let updated = directory(users, audit)
            .set_active(&user_id, false, ActorRef::System)
            .await
            .expect("deactivated");
        assert!(!updated.active);
    }

    #[tokio::test]
    async fn remove_missing_user_is_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_remove().times(1).return_once(|_| Ok(false));
        let audit = MockAuditLogRepository::new();

        let err = directory(users, audit)
            .remove(&UserId::random(), ActorRef::System)
            .await
            .expect_err("not found");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
