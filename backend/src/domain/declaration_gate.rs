//! Fitness-declaration gate.
//!
//! The declaration record is the legally relevant artefact, so it persists
//! before and independently of every consequence. On a positive disclosure
//! the gate runs a penalty chain (point deduction, temporary lockout, session
//! termination); a failure anywhere in that chain is logged and reported in
//! the outcome but never rolls the declaration back.

use std::sync::Arc;

use chrono::TimeDelta;
use mockable::Clock;
use serde_json::json;
use tracing::{error, warn};

use super::audit::{actions, map_user_error, ActorRef, EntityType, NewAuditEntry};
use super::declaration::{DeclarationAnswers, DeclarationId, LegalDeclaration};
use super::ports::{
    AuditLogRepository, DeclarationRepository, DeclarationStoreError, RewardsCommand,
    SessionTerminator, UserRepository, UserStoreError,
};
use super::user::{require_user, Lockout, UserId};
use super::Error;

/// Lockout reason code recorded on the user after a positive disclosure.
pub const LOCKOUT_REASON: &str = "legal.declaration.negative";

/// Default lockout duration in hours.
pub const DEFAULT_LOCKOUT_HOURS: i64 = 24;

/// Map declaration store failures onto domain error codes.
pub(crate) fn map_declaration_error(err: DeclarationStoreError) -> Error {
    match err {
        DeclarationStoreError::Connection { message } => Error::service_unavailable(message),
        DeclarationStoreError::Query { message } => Error::internal(message),
    }
}

/// Collaborators of the declaration gate.
///
/// Bundled as trait objects so the gate stays a single concrete type in the
/// application state regardless of which adapters back it.
#[derive(Clone)]
pub struct DeclarationGatePorts {
    /// Declaration persistence.
    pub declarations: Arc<dyn DeclarationRepository>,
    /// User store, for the lockout write.
    pub users: Arc<dyn UserRepository>,
    /// Rewards ledger, for the penalty.
    pub rewards: Arc<dyn RewardsCommand>,
    /// Identity collaborator, for forced session termination.
    pub sessions: Arc<dyn SessionTerminator>,
    /// Audit sink.
    pub audit: Arc<dyn AuditLogRepository>,
}

/// Outcome of a handled declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationOutcome {
    /// Every answer was negative; no side effects beyond the stored record.
    FitToWork,
    /// Impairment disclosed; the penalty chain ran.
    UnfitRecorded {
        /// Whether the point deduction committed. `false` means the ledger
        /// failed and the deduction must be reconciled by hand.
        penalty_applied: bool,
    },
}

/// The declaration gate service.
#[derive(Clone)]
pub struct LegalDeclarationGate {
    ports: DeclarationGatePorts,
    clock: Arc<dyn Clock>,
    lockout: TimeDelta,
}

impl LegalDeclarationGate {
    /// Create a gate with the given lockout duration.
    pub fn new(ports: DeclarationGatePorts, clock: Arc<dyn Clock>, lockout_hours: i64) -> Self {
        Self {
            ports,
            clock,
            lockout: TimeDelta::hours(lockout_hours),
        }
    }

    /// Persist a declaration and run the penalty chain when it discloses
    /// impairment.
    pub async fn handle_declaration(
        &self,
        user_id: &UserId,
        answers: DeclarationAnswers,
    ) -> Result<(LegalDeclaration, DeclarationOutcome), Error> {
        require_user(
            self.ports
                .users
                .find_by_id(user_id)
                .await
                .map_err(map_user_error)?,
            user_id,
        )?;

        let declaration = LegalDeclaration {
            id: DeclarationId::random(),
            user_id: *user_id,
            answers,
            created_at: self.clock.utc(),
        };
        self.ports
            .declarations
            .insert(&declaration)
            .await
            .map_err(map_declaration_error)?;
        self.record_submission(&declaration).await;

        if !answers.discloses_impairment() {
            return Ok((declaration, DeclarationOutcome::FitToWork));
        }

        let penalty_applied = match self
            .ports
            .rewards
            .subtract_points_for_negative_declaration(user_id)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                error!(
                    user_id = %user_id,
                    error = %err,
                    "declaration penalty failed; balance needs manual reconciliation"
                );
                false
            }
        };

        if let Err(err) = self.apply_lockout(user_id, declaration.created_at).await {
            error!(user_id = %user_id, error = %err, "declaration lockout failed");
        }

        if let Err(err) = self.ports.sessions.terminate(user_id).await {
            warn!(user_id = %user_id, error = %err, "session termination failed");
        }

        Ok((
            declaration,
            DeclarationOutcome::UnfitRecorded { penalty_applied },
        ))
    }

    /// All declarations submitted by a user, oldest first.
    pub async fn declarations_for(&self, user_id: &UserId) -> Result<Vec<LegalDeclaration>, Error> {
        self.ports
            .declarations
            .find_by_user(user_id)
            .await
            .map_err(map_declaration_error)
    }

    async fn apply_lockout(
        &self,
        user_id: &UserId,
        from: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), Error> {
        let until = from + self.lockout;
        loop {
            let current = require_user(
                self.ports
                    .users
                    .find_by_id(user_id)
                    .await
                    .map_err(map_user_error)?,
                user_id,
            )?;
            let mut updated = current.clone();
            updated.lockout = Some(Lockout {
                until,
                reason: LOCKOUT_REASON.to_owned(),
            });
            updated.revision = current.revision + 1;
            match self.ports.users.save(&updated, current.revision).await {
                Ok(()) => break,
                Err(UserStoreError::RevisionMismatch { .. }) => continue,
                Err(err) => return Err(map_user_error(err)),
            }
        }
        let entry = NewAuditEntry {
            timestamp: self.clock.utc(),
            action: actions::USER_LOCKOUT.to_owned(),
            entity_type: EntityType::User,
            entity_id: user_id.to_string(),
            changes: json!({ "until": until, "reason": LOCKOUT_REASON }),
            performed_by: ActorRef::System,
        };
        if let Err(err) = self.ports.audit.append(entry).await {
            warn!(user_id = %user_id, error = %err, "lockout audit entry failed");
        }
        Ok(())
    }

    async fn record_submission(&self, declaration: &LegalDeclaration) {
        let entry = NewAuditEntry {
            timestamp: declaration.created_at,
            action: actions::DECLARATION_SUBMIT.to_owned(),
            entity_type: EntityType::Declaration,
            entity_id: declaration.id.to_string(),
            changes: json!({
                "userId": declaration.user_id,
                "answers": declaration.answers,
            }),
            performed_by: ActorRef::User(declaration.user_id),
        };
        if let Err(err) = self.ports.audit.append(entry).await {
            warn!(
                declaration_id = %declaration.id,
                error = %err,
                "declaration audit entry failed"
            );
        }
    }
}
