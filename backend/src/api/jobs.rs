//! Operational job triggers.

use actix_web::{post, web, HttpRequest};

use crate::domain::{authorize, ResetSummary, ResetTrigger, Role};
use crate::server::AppServices;

use super::identity::actor_from_request;
use super::ApiResult;

/// Trigger the daily reset sweep out of schedule.
///
/// The job is re-entrant, so a manual run racing the scheduler is safe.
#[utoipa::path(
    post,
    path = "/api/v1/jobs/daily-reset",
    responses(
        (status = 200, description = "Sweep counters", body = ResetSummary),
        (status = 403, description = "Caller is not an administrator")
    ),
    tags = ["jobs"],
    operation_id = "triggerDailyReset"
)]
#[post("/api/v1/jobs/daily-reset")]
pub async fn trigger_daily_reset(
    req: HttpRequest,
    services: web::Data<AppServices>,
) -> ApiResult<web::Json<ResetSummary>> {
    let actor = actor_from_request(&req)?;
    authorize(&actor, &[Role::Admin])?;
    let summary = services.reset_job.run(ResetTrigger::Manual).await;
    Ok(web::Json(summary))
}
