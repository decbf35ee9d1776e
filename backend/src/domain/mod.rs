//! Domain layer: entities, ports, and the services that implement the
//! back-office rules.
//!
//! Purpose: keep every business rule — the points ledger, the package state
//! machine, the declaration consequences, the daily reset — behind typed
//! services that depend only on the ports in [`ports`]. Adapters and HTTP
//! handlers live outside this module and never reimplement a rule.
//!
//! Public surface:
//! - `Error` / `ErrorCode` — the error taxonomy shared by every service.
//! - Entities: `User`, `Package`, `LegalDeclaration`, `AuditLogEntry`.
//! - Services: `RewardsLedger`, `AuditTrail`, `PackageRegistry`,
//!   `UserDirectory`, `LegalDeclarationGate`, `DailyResetJob`,
//!   `ReportingEngine`.

pub mod access;
pub mod audit;
pub mod declaration;
pub mod declaration_gate;
pub mod directory;
pub mod error;
pub mod ledger;
pub mod package;
pub mod ports;
pub mod registry;
pub mod reporting;
pub mod reset_job;
pub mod user;

pub use self::access::{authorize, Actor};
pub use self::audit::{
    ActionTally, ActorRef, AuditLogEntry, AuditTrail, EntityActionRow, EntityType, NewAuditEntry,
};
pub use self::declaration::{DeclarationAnswers, DeclarationId, LegalDeclaration};
pub use self::declaration_gate::{
    DeclarationGatePorts, DeclarationOutcome, LegalDeclarationGate, DEFAULT_LOCKOUT_HOURS,
};
pub use self::directory::UserDirectory;
pub use self::error::{Error, ErrorCode};
pub use self::ledger::RewardsLedger;
pub use self::package::{
    DateCriteria, NewPackage, Package, PackageId, PackagePatch, PackageState,
};
pub use self::registry::PackageRegistry;
pub use self::reporting::ReportingEngine;
pub use self::reset_job::{DailyResetJob, ResetSummary, ResetTrigger};
pub use self::user::{Email, Lockout, NewUser, Role, User, UserId, UserPatch};
