//! Domain ports and supporting types for the hexagonal boundary.

mod audit_log_repository;
mod declaration_repository;
mod package_repository;
mod rewards_command;
mod session_terminator;
mod user_repository;

#[cfg(test)]
pub use audit_log_repository::MockAuditLogRepository;
pub use audit_log_repository::{AuditLogRepository, AuditStoreError, FixtureAuditLogRepository};
#[cfg(test)]
pub use declaration_repository::MockDeclarationRepository;
pub use declaration_repository::{
    DeclarationRepository, DeclarationStoreError, FixtureDeclarationRepository,
};
#[cfg(test)]
pub use package_repository::MockPackageRepository;
pub use package_repository::{FixturePackageRepository, PackageRepository, PackageStoreError};
#[cfg(test)]
pub use rewards_command::MockRewardsCommand;
pub use rewards_command::{LedgerReceipt, RewardsCommand};
#[cfg(test)]
pub use session_terminator::MockSessionTerminator;
pub use session_terminator::{FixtureSessionTerminator, SessionError, SessionTerminator};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{FixtureUserRepository, UserRepository, UserStoreError};
