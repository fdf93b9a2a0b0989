use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::Json,
};
use tracing::warn;

use crate::schemas::ErrorResponse;

/// Identity of the caller, resolved by the upstream authentication gate.
///
/// Sessions and tokens terminate at the gate, which forwards the resolved
/// user as the `X-User-Id` header. This service only requires the header to
/// be present and parseable; it never sees credentials.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub i32);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i32>().ok());

        match user_id {
            Some(id) if id > 0 => Ok(AuthenticatedUser(id)),
            _ => {
                warn!("Rejected request without a valid X-User-Id header");
                Err((
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorResponse {
                        error: "No valid authentication provided".to_string(),
                        code: "UNAUTHORIZED".to_string(),
                        success: false,
                    }),
                ))
            }
        }
    }
}
