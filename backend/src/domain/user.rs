//! User account model.
//!
//! A user carries the rewards bookkeeping (point balance, consecutive
//! delivery streak), the ordered list of assigned packages, and an optional
//! lockout applied after a negative fitness declaration. Every record holds a
//! `revision` used for compare-and-set saves; concurrent writers retry on a
//! stale revision instead of losing updates.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::package::PackageId;
use super::{Error, ErrorCode};

/// Stable user identifier stored as a UUID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
#[schema(value_type = String, example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse an identifier from its string form.
    pub fn parse(value: &str) -> Result<Self, Error> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| Error::invalid_request(format!("invalid user id: {value}")))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account roles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Entitled to receive package assignments and submit fitness
    /// declarations.
    Delivery,
    /// Entitled to override points, view reports, and manage users.
    Admin,
}

/// Email address, normalised to lowercase on construction.
///
/// Normalisation happens here, before any write reaches a repository, so
/// uniqueness checks always compare canonical values.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "ada@example.com")]
pub struct Email(String);

impl Email {
    /// Validate and normalise an email address.
    pub fn new(raw: impl Into<String>) -> Result<Self, Error> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_request("email must not be empty"));
        }
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(Error::invalid_request(format!("invalid email: {trimmed}")));
        };
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return Err(Error::invalid_request(format!("invalid email: {trimmed}")));
        }
        Ok(Self(trimmed.to_lowercase()))
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl TryFrom<String> for Email {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Temporary account lockout applied after a negative declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lockout {
    /// Instant until which the account stays locked.
    pub until: DateTime<Utc>,
    /// Stable reason code.
    #[schema(example = "legal.declaration.negative")]
    pub reason: String,
}

/// Application user record.
///
/// ## Invariants
/// - `email` is stored normalised and is unique across the directory.
/// - `points` has no floor: penalties may drive the balance negative and the
///   negative value is preserved, never clamped.
/// - `assigned_packages` keeps assignment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Given name.
    pub name: String,
    /// Family name.
    pub last_name: String,
    /// Normalised unique email.
    pub email: Email,
    /// Opaque password hash; credential mechanics live outside this service.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Granted roles.
    pub roles: BTreeSet<Role>,
    /// Whether the account is active.
    pub active: bool,
    /// Point balance. May be negative.
    pub points: i64,
    /// Consecutive successful deliveries.
    pub consecutive_deliveries: u32,
    /// Ordered identifiers of currently assigned packages.
    pub assigned_packages: Vec<PackageId>,
    /// Temporary lockout, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lockout: Option<Lockout>,
    /// Optimistic-concurrency token; starts at 1 and increments on every
    /// successful save.
    pub revision: u32,
}

impl User {
    /// Whether the user holds the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// Whether a lockout is in force at `now`.
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.lockout.as_ref().is_some_and(|lockout| lockout.until > now)
    }
}

/// Registration payload for a new user.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Given name.
    pub name: String,
    /// Family name.
    pub last_name: String,
    /// Raw email; normalised by the directory before insertion.
    pub email: String,
    /// Opaque pre-hashed credential.
    pub password_hash: String,
    /// Roles to grant.
    pub roles: BTreeSet<Role>,
}

/// Explicit patch object for user updates.
///
/// Only the present fields are applied; everything else is left untouched.
/// This replaces mapped-update DTOs with a value object validated before it
/// reaches the core.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    /// New given name.
    pub name: Option<String>,
    /// New family name.
    pub last_name: Option<String>,
    /// New raw email; re-normalised and uniqueness-checked on apply.
    pub email: Option<String>,
    /// New active flag.
    pub active: Option<bool>,
    /// Replacement role set.
    pub roles: Option<BTreeSet<Role>>,
}

impl UserPatch {
    /// Whether the patch carries no changes.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.active.is_none()
            && self.roles.is_none()
    }
}

/// Map a user lookup result to the domain's NotFound error.
pub(crate) fn require_user(user: Option<User>, id: &UserId) -> Result<User, Error> {
    user.ok_or_else(|| Error::new(ErrorCode::NotFound, format!("user not found: {id}")))
}
