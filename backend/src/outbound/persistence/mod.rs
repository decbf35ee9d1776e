//! Document-store persistence adapters.
//!
//! The deployment stores each aggregate as a versioned document; these
//! adapters keep the documents in process memory behind async locks and
//! implement the same compare-and-set contract a remote document store would:
//! a save only commits when the caller's revision matches the stored one.

mod memory_audit_log_repository;
mod memory_declaration_repository;
mod memory_package_repository;
mod memory_user_repository;

pub use memory_audit_log_repository::MemoryAuditLogRepository;
pub use memory_declaration_repository::MemoryDeclarationRepository;
pub use memory_package_repository::MemoryPackageRepository;
pub use memory_user_repository::MemoryUserRepository;
