//! Pre-shift fitness-to-drive declarations.
//!
//! Declarations are append-only: one record per submission, history kept, no
//! per-day uniqueness.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::UserId;
use super::Error;

/// Stable declaration identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = String)]
pub struct DeclarationId(Uuid);

impl DeclarationId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier from its string form.
    pub fn parse(value: &str) -> Result<Self, Error> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| Error::invalid_request(format!("invalid declaration id: {value}")))
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The three self-reported answers.
///
/// `true` means a positive disclosure of impairment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationAnswers {
    /// Alcohol consumption.
    pub alcohol: bool,
    /// Psychoactive substances.
    pub psychoactive_substances: bool,
    /// Emotional distress.
    pub emotional_distress: bool,
}

impl DeclarationAnswers {
    /// Whether any answer discloses impairment.
    pub fn discloses_impairment(self) -> bool {
        self.alcohol || self.psychoactive_substances || self.emotional_distress
    }
}

/// A stored fitness declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LegalDeclaration {
    /// Stable identifier.
    pub id: DeclarationId,
    /// Declaring user.
    pub user_id: UserId,
    /// The three answers.
    pub answers: DeclarationAnswers,
    /// Submission instant.
    pub created_at: DateTime<Utc>,
}
