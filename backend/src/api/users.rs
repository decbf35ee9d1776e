//! User directory and rewards-ledger endpoints.

use actix_web::{delete, get, patch, post, put, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{LedgerReceipt, RewardsCommand};
use crate::domain::{authorize, NewUser, Role, User, UserId, UserPatch};
use crate::server::AppServices;

use super::identity::actor_from_request;
use super::ApiResult;

/// Request body for the activation toggle.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    /// Desired active flag.
    pub active: bool,
}

/// Request body for the administrative balance override.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPointsRequest {
    /// Absolute new balance. May be negative.
    pub points: i64,
}

/// Request body for the undelivered-packages penalty.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UndeliveredPenaltyRequest {
    /// Number of packages left undelivered.
    pub packages_count: u32,
}

/// Read-only balance projection.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PointsResponse {
    /// The queried user.
    pub user_id: UserId,
    /// Current balance.
    pub points: i64,
}

/// Register a new user.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Malformed payload"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 409, description = "Email already registered")
    ),
    tags = ["users"],
    operation_id = "registerUser"
)]
#[post("/api/v1/users")]
pub async fn register(
    req: HttpRequest,
    services: web::Data<AppServices>,
    body: web::Json<NewUser>,
) -> ApiResult<HttpResponse> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let user = services
        .directory
        .register(body.into_inner(), actor.as_ref())
        .await?;
    Ok(HttpResponse::Created().json(user))
}

/// Fetch a user by identifier.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User", body = User),
        (status = 404, description = "Unknown user")
    ),
    tags = ["users"],
    operation_id = "getUser"
)]
#[get("/api/v1/users/{id}")]
pub async fn get_user(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> ApiResult<web::Json<User>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[])?;
    let user_id = UserId::parse(&path)?;
    let user = services.directory.find_by_id(&user_id).await?;
    Ok(web::Json(user))
}

/// Apply a partial update to a user.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User identifier")),
    request_body = UserPatch,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 404, description = "Unknown user"),
        (status = 409, description = "Email already registered")
    ),
    tags = ["users"],
    operation_id = "updateUser"
)]
#[patch("/api/v1/users/{id}")]
pub async fn update_user(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
    body: web::Json<UserPatch>,
) -> ApiResult<web::Json<User>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let user_id = UserId::parse(&path)?;
    let user = services
        .directory
        .update(&user_id, body.into_inner(), actor.as_ref())
        .await?;
    Ok(web::Json(user))
}

/// Activate or deactivate an account.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/active",
    params(("id" = String, Path, description = "User identifier")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 404, description = "Unknown user")
    ),
    tags = ["users"],
    operation_id = "setUserActive"
)]
#[put("/api/v1/users/{id}/active")]
pub async fn set_active(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
    body: web::Json<SetActiveRequest>,
) -> ApiResult<web::Json<User>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let user_id = UserId::parse(&path)?;
    let user = services
        .directory
        .set_active(&user_id, body.active, actor.as_ref())
        .await?;
    Ok(web::Json(user))
}

/// Remove an account.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 204, description = "User removed"),
        (status = 404, description = "Unknown user")
    ),
    tags = ["users"],
    operation_id = "removeUser"
)]
#[delete("/api/v1/users/{id}")]
pub async fn remove_user(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let user_id = UserId::parse(&path)?;
    services.directory.remove(&user_id, actor.as_ref()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Read a user's balance.
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/points",
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Current balance", body = PointsResponse),
        (status = 404, description = "Unknown user")
    ),
    tags = ["points"],
    operation_id = "getUserPoints"
)]
#[get("/api/v1/users/{id}/points")]
pub async fn get_points(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> ApiResult<web::Json<PointsResponse>> {
    let actor = actor_from_request(&req)?;
    let user_id = UserId::parse(&path)?;
    // Couriers may read their own balance; everything else is admin only.
    if actor.user_id != user_id {
        authorize(&actor, &[Role::Admin])?;
    }
    let points = services.ledger.get_user_points(&user_id).await?;
    Ok(web::Json(PointsResponse { user_id, points }))
}

/// Administrative absolute override of a balance.
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}/points",
    params(("id" = String, Path, description = "User identifier")),
    request_body = SetPointsRequest,
    responses(
        (status = 200, description = "Balance after the override", body = LedgerReceipt),
        (status = 404, description = "Unknown user")
    ),
    tags = ["points"],
    operation_id = "setUserPoints"
)]
#[put("/api/v1/users/{id}/points")]
pub async fn set_points(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
    body: web::Json<SetPointsRequest>,
) -> ApiResult<web::Json<LedgerReceipt>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let user_id = UserId::parse(&path)?;
    let receipt = services
        .ledger
        .set_points(&user_id, body.points, actor.as_ref())
        .await?;
    Ok(web::Json(receipt))
}

/// Apply the cancellation penalty.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/points/cancellation",
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Balance after the penalty", body = LedgerReceipt),
        (status = 404, description = "Unknown user")
    ),
    tags = ["points"],
    operation_id = "applyCancellationPenalty"
)]
#[post("/api/v1/users/{id}/points/cancellation")]
pub async fn cancellation_penalty(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> ApiResult<web::Json<LedgerReceipt>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let user_id = UserId::parse(&path)?;
    let receipt = services
        .ledger
        .subtract_points_for_cancellation(&user_id)
        .await?;
    Ok(web::Json(receipt))
}

/// Apply the undelivered-packages penalty.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/points/undelivered",
    params(("id" = String, Path, description = "User identifier")),
    request_body = UndeliveredPenaltyRequest,
    responses(
        (status = 200, description = "Balance after the penalty", body = LedgerReceipt),
        (status = 404, description = "Unknown user")
    ),
    tags = ["points"],
    operation_id = "applyUndeliveredPenalty"
)]
#[post("/api/v1/users/{id}/points/undelivered")]
pub async fn undelivered_penalty(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
    body: web::Json<UndeliveredPenaltyRequest>,
) -> ApiResult<web::Json<LedgerReceipt>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let user_id = UserId::parse(&path)?;
    let receipt = services
        .ledger
        .subtract_points_for_undelivered_packages(&user_id, body.packages_count, actor.as_ref())
        .await?;
    Ok(web::Json(receipt))
}

/// Reset a user's consecutive-delivery streak.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/streak/reset",
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Balance after the reset", body = LedgerReceipt),
        (status = 404, description = "Unknown user")
    ),
    tags = ["points"],
    operation_id = "resetUserStreak"
)]
#[post("/api/v1/users/{id}/streak/reset")]
pub async fn reset_streak(
    req: HttpRequest,
    services: web::Data<AppServices>,
    path: web::Path<String>,
) -> ApiResult<web::Json<LedgerReceipt>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let user_id = UserId::parse(&path)?;
    let receipt = services
        .ledger
        .reset_consecutive_deliveries(&user_id)
        .await?;
    Ok(web::Json(receipt))
}
