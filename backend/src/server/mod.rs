//! Application wiring: stores, services, routes, and the scheduler.

mod config;
pub mod scheduler;
mod seed;

pub use config::Config;
pub use seed::seed_example_data;

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use crate::api::{declarations, health, jobs, packages, reports, users};
use crate::domain::ports::{
    AuditLogRepository, FixtureSessionTerminator, RewardsCommand, UserRepository,
};
use crate::domain::{
    AuditTrail, DailyResetJob, DeclarationGatePorts, LegalDeclarationGate, PackageRegistry,
    ReportingEngine, RewardsLedger, UserDirectory,
};
use crate::outbound::persistence::{
    MemoryAuditLogRepository, MemoryDeclarationRepository, MemoryPackageRepository,
    MemoryUserRepository,
};

/// Concrete store types for this deployment.
pub type Users = MemoryUserRepository;
/// Package store.
pub type Packages = MemoryPackageRepository;
/// Audit log store.
pub type Audit = MemoryAuditLogRepository;
/// Declaration store.
pub type Declarations = MemoryDeclarationRepository;

/// Shared store handles, kept separate from the services so seeding and
/// integration tests can reach the documents directly.
#[derive(Clone)]
pub struct Stores {
    /// User documents.
    pub users: Arc<Users>,
    /// Package documents.
    pub packages: Arc<Packages>,
    /// Audit entries.
    pub audit: Arc<Audit>,
    /// Declaration records.
    pub declarations: Arc<Declarations>,
}

impl Stores {
    /// Create empty stores.
    pub fn new() -> Self {
        Self {
            users: Arc::new(Users::new()),
            packages: Arc::new(Packages::new()),
            audit: Arc::new(Audit::new()),
            declarations: Arc::new(Declarations::new()),
        }
    }
}

impl Default for Stores {
    fn default() -> Self {
        Self::new()
    }
}

/// Domain services exposed to HTTP handlers via `web::Data`.
pub struct AppServices {
    /// User accounts.
    pub directory: UserDirectory<Users, Audit>,
    /// Points and streak bookkeeping.
    pub ledger: Arc<RewardsLedger<Users, Audit>>,
    /// Audit reads.
    pub trail: Arc<AuditTrail<Audit, Users>>,
    /// Package lifecycle.
    pub registry: Arc<PackageRegistry<Packages, Users>>,
    /// Fitness declarations.
    pub gate: LegalDeclarationGate,
    /// The reset sweep, shared with the scheduler.
    pub reset_job: Arc<DailyResetJob<Packages, Users>>,
    /// Administrative reports.
    pub reporting: ReportingEngine<Audit, Users, Packages>,
}

/// Wire every service over the given stores.
pub fn build_services(stores: &Stores, lockout_hours: i64) -> AppServices {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let audit_port: Arc<dyn AuditLogRepository> = stores.audit.clone();

    let ledger = Arc::new(RewardsLedger::new(
        stores.users.clone(),
        stores.audit.clone(),
        clock.clone(),
    ));
    let rewards: Arc<dyn RewardsCommand> = ledger.clone();

    let registry = Arc::new(PackageRegistry::new(
        stores.packages.clone(),
        stores.users.clone(),
        rewards.clone(),
        audit_port.clone(),
        clock.clone(),
    ));
    let trail = Arc::new(AuditTrail::new(stores.audit.clone(), stores.users.clone()));
    let users_port: Arc<dyn UserRepository> = stores.users.clone();
    let gate = LegalDeclarationGate::new(
        DeclarationGatePorts {
            declarations: stores.declarations.clone(),
            users: users_port,
            rewards,
            sessions: Arc::new(FixtureSessionTerminator),
            audit: audit_port.clone(),
        },
        clock.clone(),
        lockout_hours,
    );
    let reset_job = Arc::new(DailyResetJob::new(
        registry.clone(),
        stores.packages.clone(),
        stores.users.clone(),
        audit_port,
        clock.clone(),
    ));

    AppServices {
        directory: UserDirectory::new(stores.users.clone(), stores.audit.clone(), clock),
        ledger,
        trail: trail.clone(),
        registry: registry.clone(),
        gate,
        reset_job,
        reporting: ReportingEngine::new(trail, registry),
    }
}

/// Register every API route.
///
/// The literal `/packages/assigned` route must precede `/packages/{id}`.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(users::register)
        .service(users::update_user)
        .service(users::set_active)
        .service(users::remove_user)
        .service(users::get_points)
        .service(users::set_points)
        .service(users::cancellation_penalty)
        .service(users::undelivered_penalty)
        .service(users::reset_streak)
        .service(users::get_user)
        .service(packages::create_package)
        .service(packages::list_assigned)
        .service(packages::assign)
        .service(packages::start_delivery)
        .service(packages::mark_delivered)
        .service(packages::get_package)
        .service(declarations::submit)
        .service(declarations::history)
        .service(reports::headcount_detail)
        .service(reports::headcount)
        .service(reports::packages)
        .service(reports::audit_trail)
        .service(jobs::trigger_daily_reset)
        .service(health::ready)
        .service(health::live);
}
