//! Port for the identity/session collaborator.
//!
//! The core never manages credentials or tokens; it only asks the session
//! service to revoke every active session of a user after a policy violation.

use async_trait::async_trait;

use crate::domain::user::UserId;

/// Errors raised by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session service could not be reached.
    #[error("session service unavailable: {message}")]
    Unavailable {
        /// Collaborator-specific description.
        message: String,
    },
}

/// Port for forced session termination.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionTerminator: Send + Sync {
    /// Revoke every active session of the given user.
    async fn terminate(&self, user_id: &UserId) -> Result<(), SessionError>;
}

/// Fixture terminator used when no session collaborator is wired.
///
/// Termination is logged and reported as successful; the identity service is
/// an external collaborator in this deployment.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureSessionTerminator;

#[async_trait]
impl SessionTerminator for FixtureSessionTerminator {
    async fn terminate(&self, user_id: &UserId) -> Result<(), SessionError> {
        tracing::info!(user_id = %user_id, "session termination requested");
        Ok(())
    }
}
