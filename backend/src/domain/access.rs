//! Capability checks for inbound requests.
//!
//! A pure function over an explicit [`Actor`]; no request-context globals.
//! The identity collaborator authenticates the caller and supplies the actor;
//! this module only decides whether the actor's roles cover an operation.

use serde::Serialize;
use utoipa::ToSchema;

use super::audit::ActorRef;
use super::user::{Role, UserId};
use super::Error;

/// Authenticated caller as supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// The caller's user identifier.
    pub user_id: UserId,
    /// Roles granted to the caller.
    pub roles: Vec<Role>,
}

impl Actor {
    /// Audit reference for this actor.
    pub fn as_ref(&self) -> ActorRef {
        ActorRef::User(self.user_id)
    }
}

/// Allow when the actor holds at least one of the required roles.
///
/// An empty requirement list means any authenticated actor is allowed.
pub fn authorize(actor: &Actor, required: &[Role]) -> Result<(), Error> {
    if required.is_empty() || required.iter().any(|role| actor.roles.contains(role)) {
        return Ok(());
    }
    Err(Error::forbidden(format!(
        "actor {} lacks required role",
        actor.user_id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;

    fn actor(roles: &[Role]) -> Actor {
        Actor {
            user_id: UserId::random(),
            roles: roles.to_vec(),
        }
    }

    #[test]
    fn allows_matching_role() {
        let actor = actor(&[Role::Delivery]);
        assert!(authorize(&actor, &[Role::Delivery]).is_ok());
    }

    #[test]
    fn allows_any_of_required_roles() {
        let actor = actor(&[Role::Admin]);
        assert!(authorize(&actor, &[Role::Delivery, Role::Admin]).is_ok());
    }

    #[test]
    fn rejects_missing_role() {
        let actor = actor(&[Role::Delivery]);
        let err = authorize(&actor, &[Role::Admin]).expect_err("forbidden");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[test]
    fn empty_requirement_allows_any_actor() {
        let actor = actor(&[]);
        assert!(authorize(&actor, &[]).is_ok());
    }
}
