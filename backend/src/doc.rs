//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] generates the OpenAPI specification for the REST API: every
//! endpoint, the shared error envelope, and the gateway identity scheme. The
//! document is served as JSON in debug builds and consumed by external
//! tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::declarations::DeclarationResponse;
use crate::api::error::ApiError;
use crate::api::packages::{AssignRequest, DeliveryResponse};
use crate::api::users::{
    PointsResponse, SetActiveRequest, SetPointsRequest, UndeliveredPenaltyRequest,
};
use crate::domain::ports::LedgerReceipt;
use crate::domain::{
    ActionTally, ActorRef, AuditLogEntry, DeclarationAnswers, EntityActionRow, EntityType,
    ErrorCode, LegalDeclaration, Lockout, NewPackage, NewUser, Package, PackagePatch,
    PackageState, ResetSummary, Role, User, UserPatch,
};

/// Enrich the generated document with the gateway identity scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "GatewayIdentity",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                "x-actor-id",
                "Verified caller identity forwarded by the gateway, paired \
                 with x-actor-roles.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Dispatch backend API",
        description = "Delivery-logistics back office: user accounts, the \
                       package lifecycle, fitness declarations, the rewards \
                       ledger, and administrative reporting."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("GatewayIdentity" = [])),
    paths(
        crate::api::users::register,
        crate::api::users::get_user,
        crate::api::users::update_user,
        crate::api::users::set_active,
        crate::api::users::remove_user,
        crate::api::users::get_points,
        crate::api::users::set_points,
        crate::api::users::cancellation_penalty,
        crate::api::users::undelivered_penalty,
        crate::api::users::reset_streak,
        crate::api::packages::create_package,
        crate::api::packages::get_package,
        crate::api::packages::list_assigned,
        crate::api::packages::assign,
        crate::api::packages::start_delivery,
        crate::api::packages::mark_delivered,
        crate::api::declarations::submit,
        crate::api::declarations::history,
        crate::api::reports::headcount,
        crate::api::reports::headcount_detail,
        crate::api::reports::packages,
        crate::api::reports::audit_trail,
        crate::api::jobs::trigger_daily_reset,
        crate::api::health::ready,
        crate::api::health::live,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        User,
        NewUser,
        UserPatch,
        Role,
        Lockout,
        Package,
        NewPackage,
        PackagePatch,
        PackageState,
        AssignRequest,
        DeliveryResponse,
        LegalDeclaration,
        DeclarationAnswers,
        DeclarationResponse,
        AuditLogEntry,
        EntityType,
        ActorRef,
        ActionTally,
        EntityActionRow,
        ResetSummary,
        LedgerReceipt,
        PointsResponse,
        SetActiveRequest,
        SetPointsRequest,
        UndeliveredPenaltyRequest,
    )),
    tags(
        (name = "users", description = "Account management"),
        (name = "points", description = "Rewards ledger operations"),
        (name = "packages", description = "Package lifecycle"),
        (name = "declarations", description = "Fitness-to-drive declarations"),
        (name = "reports", description = "Administrative reporting"),
        (name = "jobs", description = "Operational job triggers"),
        (name = "health", description = "Health probes")
    )
)]
pub struct ApiDoc;
