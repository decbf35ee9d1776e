//! Fitness-declaration endpoints.

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{authorize, DeclarationAnswers, DeclarationOutcome, LegalDeclaration, Role};
use crate::server::AppServices;

use super::identity::actor_from_request;
use super::ApiResult;

/// Response for a submitted declaration.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationResponse {
    /// The stored declaration.
    pub declaration: LegalDeclaration,
    /// Whether the caller is fit to work today.
    pub fit_to_work: bool,
    /// Whether the point penalty committed; absent for fit declarations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty_applied: Option<bool>,
}

/// Submit today's fitness declaration for the calling courier.
#[utoipa::path(
    post,
    path = "/api/v1/declarations",
    request_body = DeclarationAnswers,
    responses(
        (status = 201, description = "Declaration recorded", body = DeclarationResponse),
        (status = 403, description = "Caller is not a delivery person"),
        (status = 503, description = "Declaration store unavailable")
    ),
    tags = ["declarations"],
    operation_id = "submitDeclaration"
)]
#[post("/api/v1/declarations")]
pub async fn submit(
    req: HttpRequest,
    services: web::Data<AppServices>,
    body: web::Json<DeclarationAnswers>,
) -> ApiResult<HttpResponse> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Delivery])?;
    let (declaration, outcome) = services
        .gate
        .handle_declaration(&actor.user_id, body.into_inner())
        .await?;
    let response = match outcome {
        DeclarationOutcome::FitToWork => DeclarationResponse {
            declaration,
            fit_to_work: true,
            penalty_applied: None,
        },
        DeclarationOutcome::UnfitRecorded { penalty_applied } => DeclarationResponse {
            declaration,
            fit_to_work: false,
            penalty_applied: Some(penalty_applied),
        },
    };
    Ok(HttpResponse::Created().json(response))
}

/// The calling courier's declaration history, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/declarations/me",
    responses(
        (status = 200, description = "Declaration history", body = [LegalDeclaration]),
        (status = 403, description = "Caller is not a delivery person")
    ),
    tags = ["declarations"],
    operation_id = "myDeclarations"
)]
#[get("/api/v1/declarations/me")]
pub async fn history(
    req: HttpRequest,
    services: web::Data<AppServices>,
) -> ApiResult<web::Json<Vec<LegalDeclaration>>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Delivery])?;
    let declarations = services.gate.declarations_for(&actor.user_id).await?;
    Ok(web::Json(declarations))
}
