//! Package lifecycle endpoints.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::LedgerReceipt;
use crate::domain::{authorize, NewPackage, Package, PackageId, Role, UserId};
use crate::server::AppServices;

use super::identity::actor_from_request;
use super::ApiResult;

/// Request body for package assignment.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    /// The delivery person receiving the package.
    pub user_id: UserId,
}

/// Response for a completed delivery: the package plus the point credit.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResponse {
    /// The delivered package.
    pub package: Package,
    /// Balance after the delivery reward.
    pub receipt: LedgerReceipt,
}

/// Create a package.
#[utoipa::path(
    post,
    path = "/api/v1/packages",
    request_body = NewPackage,
    responses(
        (status = 201, description = "Package created", body = Package),
        (status = 403, description = "Caller is not an administrator")
    ),
    tags = ["packages"],
    operation_id = "createPackage"
)]
#[post("/api/v1/packages")]
pub async fn create_package(
    req: HttpRequest,
    services: web::Data<AppServices>,
    body: web::Json<NewPackage>,
) -> ApiResult<HttpResponse> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let package = services
        .registry
        .create_package(body.into_inner(), actor.as_ref())
        .await?;
    Ok(HttpResponse::Created().json(package))
}

/// Fetch a package by identifier.
#[utoipa::path(
    get,
    path = "/api/v1/packages/{id}",
    params(("id" = String, Path, description = "Package identifier")),
    responses(
        (status = 200, description = "Package", body = Package),
        (status = 404, description = "Unknown package")
    ),
    tags = ["packages"],
    operation_id = "getPackage"
)]
#[get("/api/v1/packages/{id}")]
pub async fn get_package(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Package>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[])?;
    let package_id = PackageId::parse(&path)?;
    let package = services.registry.find_by_id(&package_id).await?;
    Ok(web::Json(package))
}

/// All packages currently carrying an assignee.
#[utoipa::path(
    get,
    path = "/api/v1/packages/assigned",
    responses(
        (status = 200, description = "Assigned packages", body = [Package]),
        (status = 403, description = "Caller is not an administrator")
    ),
    tags = ["packages"],
    operation_id = "listAssignedPackages"
)]
#[get("/api/v1/packages/assigned")]
pub async fn list_assigned(
    req: HttpRequest,
    services: web::Data<AppServices>,
) -> ApiResult<web::Json<Vec<Package>>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let packages = services.registry.find_all_with_delivery_man().await?;
    Ok(web::Json(packages))
}

/// Assign an available package to a delivery person.
#[utoipa::path(
    post,
    path = "/api/v1/packages/{id}/assign",
    params(("id" = String, Path, description = "Package identifier")),
    request_body = AssignRequest,
    responses(
        (status = 200, description = "Assigned package", body = Package),
        (status = 404, description = "Unknown package or user"),
        (status = 406, description = "Assignment preconditions not met")
    ),
    tags = ["packages"],
    operation_id = "assignPackage"
)]
#[post("/api/v1/packages/{id}/assign")]
pub async fn assign(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
    body: web::Json<AssignRequest>,
) -> ApiResult<web::Json<Package>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin, Role::Delivery])?;
    let package_id = PackageId::parse(&path)?;
    let package = services
        .registry
        .assign(&package_id, &body.user_id, actor.as_ref())
        .await?;
    Ok(web::Json(package))
}

/// Start delivering an assigned package.
#[utoipa::path(
    post,
    path = "/api/v1/packages/{id}/start",
    params(("id" = String, Path, description = "Package identifier")),
    responses(
        (status = 200, description = "Package in transit", body = Package),
        (status = 404, description = "Unknown package"),
        (status = 406, description = "Not pending, or caller is not the assignee")
    ),
    tags = ["packages"],
    operation_id = "startDelivery"
)]
#[post("/api/v1/packages/{id}/start")]
pub async fn start_delivery(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Package>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Delivery])?;
    let package_id = PackageId::parse(&path)?;
    let package = services
        .registry
        .start_delivery(&package_id, &actor.user_id)
        .await?;
    Ok(web::Json(package))
}

/// Complete a delivery and credit the caller.
#[utoipa::path(
    post,
    path = "/api/v1/packages/{id}/delivered",
    params(("id" = String, Path, description = "Package identifier")),
    responses(
        (status = 200, description = "Delivered package and reward", body = DeliveryResponse),
        (status = 404, description = "Unknown package"),
        (status = 406, description = "Not deliverable, or caller is not the assignee")
    ),
    tags = ["packages"],
    operation_id = "markDelivered"
)]
#[post("/api/v1/packages/{id}/delivered")]
pub async fn mark_delivered(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> ApiResult<web::Json<DeliveryResponse>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Delivery])?;
    let package_id = PackageId::parse(&path)?;
    let (package, receipt) = services
        .registry
        .mark_delivered(&package_id, &actor.user_id)
        .await?;
    Ok(web::Json(DeliveryResponse { package, receipt }))
}
