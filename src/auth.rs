use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::service::AppState;

/// Caller identity resolved from an `Authorization: Bearer` token through the
/// configured identity table.
#[derive(Debug, Clone, Copy)]
pub struct AuthBearer(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthBearer {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized)?;

        match state.resolve_token(bearer.token()) {
            Some(user_id) => Ok(Self(user_id)),
            None => {
                debug!("unknown bearer token");
                Err(ApiError::Unauthorized)
            }
        }
    }
}
