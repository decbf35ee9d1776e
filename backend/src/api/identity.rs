//! Actor extraction from the identity collaborator's trusted headers.
//!
//! Authentication happens upstream: the gateway verifies the caller and
//! forwards the verified identity in `X-Actor-Id` / `X-Actor-Roles`. Handlers
//! turn those headers into a domain [`Actor`] and pass it to
//! [`authorize`](crate::domain::authorize) explicitly; nothing here consults
//! request-context globals.

use actix_web::HttpRequest;

use crate::domain::{Actor, Error, Role, UserId};

use super::ApiError;

/// Header carrying the verified caller id.
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the caller's comma-separated roles.
pub const ACTOR_ROLES_HEADER: &str = "x-actor-roles";

fn parse_role(raw: &str) -> Result<Role, Error> {
    match raw.trim() {
        "delivery" => Ok(Role::Delivery),
        "admin" => Ok(Role::Admin),
        other => Err(Error::invalid_request(format!("unknown role: {other}"))),
    }
}

/// Build the acting identity from the trusted gateway headers.
pub fn actor_from_request(req: &HttpRequest) -> Result<Actor, ApiError> {
    let raw_id = req
        .headers()
        .get(ACTOR_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::from(Error::unauthorized("missing actor identity")))?;
    let user_id = UserId::parse(raw_id)
        .map_err(|_| Error::unauthorized(format!("malformed actor identity: {raw_id}")))?;

    let roles = match req
        .headers()
        .get(ACTOR_ROLES_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        Some(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(parse_role)
            .collect::<Result<Vec<Role>, Error>>()?,
        _ => Vec::new(),
    };

    Ok(Actor { user_id, roles })
}
