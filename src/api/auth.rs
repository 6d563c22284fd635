//! Caller identity forwarded by the gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::action::ActionResult;
use crate::domain::aggregates::Role;
use crate::policy::Actor;
use crate::StorefrontError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

fn actor_from_parts(parts: &Parts) -> Result<Actor, StorefrontError> {
    let user_id = header(parts, USER_ID_HEADER)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or(StorefrontError::Unauthorized)?;
    let role = match header(parts, USER_ROLE_HEADER) {
        Some(raw) => raw.parse::<Role>().map_err(|_| StorefrontError::Unauthorized)?,
        None => Role::User,
    };
    Ok(Actor { user_id, role })
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ActionResult<()>;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_parts(parts).map_err(|e| {
            tracing::debug!(path = %parts.uri.path(), "request without a usable identity");
            ActionResult::failed(&e)
        })
    }
}
