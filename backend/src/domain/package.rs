//! Package model and its delivery state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::user::UserId;
use super::Error;

/// Stable package identifier stored as a UUID.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
#[schema(value_type = String, example = "6f9e2f6b-8a3e-4a7d-9f6d-2d7a1a5c9e01")]
pub struct PackageId(Uuid);

impl PackageId {
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
            .map_err(|_| Error::invalid_request(format!("invalid package id: {value}")))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery lifecycle states.
///
/// Interactive transitions only ever move forward:
/// `Available → Pending → OnTheWay → Delivered`. The daily reset job forces
/// assigned packages back to [`PackageState::Available`] regardless of their
/// current position in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PackageState {
    /// Unassigned and claimable.
    Available,
    /// Assigned, not yet picked up.
    Pending,
    /// In transit.
    OnTheWay,
    /// Delivered; terminal for interactive flows.
    Delivered,
}

impl PackageState {
    /// Whether an interactive transition from `self` to `next` is allowed.
    pub fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Available, Self::Pending)
                | (Self::Pending, Self::OnTheWay)
                | (Self::Pending, Self::Delivered)
                | (Self::OnTheWay, Self::Delivered)
        )
    }

    /// Stable wire label, matching the serde representation.
    pub fn label(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Pending => "pending",
            Self::OnTheWay => "on-the-way",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Package record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Stable identifier.
    pub id: PackageId,
    /// Free-text description of the contents.
    pub description: String,
    /// Delivery address.
    pub address: String,
    /// Weight in grams.
    pub weight_grams: u32,
    /// Scheduled delivery date.
    pub delivery_date: DateTime<Utc>,
    /// Current lifecycle state.
    pub state: PackageState,
    /// Assigned delivery person, cleared (not deleted) on reset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_man: Option<UserId>,
    /// Optimistic-concurrency token; starts at 1.
    pub revision: u32,
}

/// Creation payload for a new package.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewPackage {
    /// Free-text description of the contents.
    pub description: String,
    /// Delivery address.
    pub address: String,
    /// Weight in grams.
    pub weight_grams: u32,
    /// Scheduled delivery date.
    pub delivery_date: DateTime<Utc>,
}

/// Explicit patch object for package updates.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PackagePatch {
    /// New description.
    pub description: Option<String>,
    /// New delivery address.
    pub address: Option<String>,
    /// New weight in grams.
    pub weight_grams: Option<u32>,
    /// New scheduled delivery date.
    pub delivery_date: Option<DateTime<Utc>>,
}

/// Day-scoped report filter over delivery dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateCriteria {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1–12).
    pub month: u32,
    /// Day of month (1–31).
    pub day: u32,
    /// Restrict to a single assignee when present.
    pub delivery_man: Option<UserId>,
    /// Widen from delivered-only to every state.
    pub include_all: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PackageState::Available, PackageState::Pending, true)]
    #[case(PackageState::Pending, PackageState::OnTheWay, true)]
    #[case(PackageState::Pending, PackageState::Delivered, true)]
    #[case(PackageState::OnTheWay, PackageState::Delivered, true)]
    #[case(PackageState::Available, PackageState::Delivered, false)]
    #[case(PackageState::Available, PackageState::OnTheWay, false)]
    #[case(PackageState::Delivered, PackageState::Pending, false)]
    #[case(PackageState::Delivered, PackageState::Available, false)]
    #[case(PackageState::OnTheWay, PackageState::Pending, false)]
    fn interactive_transitions(
        #[case] from: PackageState,
        #[case] to: PackageState,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.allows(to), allowed);
    }

    #[test]
    fn state_serialises_as_kebab_case() {
        let value = serde_json::to_value(PackageState::OnTheWay).expect("serialise state");
        assert_eq!(value, serde_json::json!("on-the-way"));
        assert_eq!(PackageState::OnTheWay.label(), "on-the-way");
    }
}
