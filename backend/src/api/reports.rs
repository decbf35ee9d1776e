//! Administrative reporting endpoints.

use actix_web::{get, web, HttpRequest};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{
    authorize, ActionTally, AuditLogEntry, DateCriteria, EntityActionRow, Package, Role, UserId,
};
use crate::server::AppServices;

use super::identity::actor_from_request;
use super::ApiResult;

/// Reporting window over audit timestamps.
#[derive(Debug, Deserialize, IntoParams)]
pub struct WindowQuery {
    /// Window start (inclusive), RFC 3339.
    pub start: DateTime<Utc>,
    /// Window end (inclusive), RFC 3339.
    pub end: DateTime<Utc>,
}

/// Day-scoped package report filter.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PackagesReportQuery {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1–12).
    pub month: u32,
    /// Day of month (1–31).
    pub day: u32,
    /// Restrict to a single assignee.
    pub user_id: Option<UserId>,
    /// Widen from delivered-only to every state.
    #[serde(default)]
    pub include_all: bool,
}

/// Active/inactive headcount over the window.
#[utoipa::path(
    get,
    path = "/api/v1/reports/headcount",
    params(WindowQuery),
    responses(
        (status = 200, description = "Headcount tallies", body = [ActionTally]),
        (status = 400, description = "Inverted window"),
        (status = 403, description = "Caller is not an administrator")
    ),
    tags = ["reports"],
    operation_id = "headcountReport"
)]
#[get("/api/v1/reports/headcount")]
pub async fn headcount(
    req: HttpRequest,
    services: web::Data<AppServices>,
    query: web::Query<WindowQuery>,
) -> ApiResult<web::Json<Vec<ActionTally>>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let tallies = services.reporting.headcount(query.start, query.end).await?;
    Ok(web::Json(tallies))
}

/// Per-user drill-down of the headcount classification.
#[utoipa::path(
    get,
    path = "/api/v1/reports/headcount/detail",
    params(WindowQuery),
    responses(
        (status = 200, description = "Headcount rows", body = [EntityActionRow]),
        (status = 400, description = "Inverted window"),
        (status = 403, description = "Caller is not an administrator")
    ),
    tags = ["reports"],
    operation_id = "headcountDetailReport"
)]
#[get("/api/v1/reports/headcount/detail")]
pub async fn headcount_detail(
    req: HttpRequest,
    services: web::Data<AppServices>,
    query: web::Query<WindowQuery>,
) -> ApiResult<web::Json<Vec<EntityActionRow>>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let rows = services
        .reporting
        .headcount_detail(query.start, query.end)
        .await?;
    Ok(web::Json(rows))
}

/// Packages matching a delivery-date day, optionally per assignee.
#[utoipa::path(
    get,
    path = "/api/v1/reports/packages",
    params(PackagesReportQuery),
    responses(
        (status = 200, description = "Matching packages", body = [Package]),
        (status = 400, description = "Impossible calendar date"),
        (status = 403, description = "Caller is not an administrator")
    ),
    tags = ["reports"],
    operation_id = "packagesReport"
)]
#[get("/api/v1/reports/packages")]
pub async fn packages(
    req: HttpRequest,
    services: web::Data<AppServices>,
    query: web::Query<PackagesReportQuery>,
) -> ApiResult<web::Json<Vec<Package>>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let criteria = DateCriteria {
        year: query.year,
        month: query.month,
        day: query.day,
        delivery_man: query.user_id,
        include_all: query.include_all,
    };
    let matched = services.reporting.packages_report(&criteria).await?;
    Ok(web::Json(matched))
}

/// The raw audit trail in insertion order.
#[utoipa::path(
    get,
    path = "/api/v1/reports/audit",
    responses(
        (status = 200, description = "Audit entries", body = [AuditLogEntry]),
        (status = 403, description = "Caller is not an administrator")
    ),
    tags = ["reports"],
    operation_id = "auditTrail"
)]
#[get("/api/v1/reports/audit")]
pub async fn audit_trail(
    req: HttpRequest,
    services: web::Data<AppServices>,
) -> ApiResult<web::Json<Vec<AuditLogEntry>>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let entries = services.trail.find_all().await?;
    Ok(web::Json(entries))
}
