//! Bearer-token extractor: verifies the `Authorization` header and
//! loads the authenticated user for handlers to consume.

use axum::extract::FromRequestParts;
use axum::http::{StatusCode, header, request::Parts};
use axum::response::Json;
use chrono::Utc;
use model::entities::user;
use service::ServiceError;
use tracing::warn;

use crate::schemas::{AppState, ErrorResponse, service_error};

/// The authenticated user behind a valid bearer token.
#[derive(Debug)]
pub struct AuthUser(pub user::Model);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                service_error(ServiceError::Auth("missing bearer token".to_string()))
            })?;

        let user_id = service::auth::verify_token(
            state.config.token_secret.as_bytes(),
            token,
            Utc::now().timestamp(),
        )
        .map_err(|err| {
            warn!("Rejected bearer token: {}", err);
            service_error(err)
        })?;

        let user = service::users::get_active_user(&state.db, user_id)
            .await
            .map_err(|err| match err {
                // A token naming a vanished user is an auth failure,
                // not a resource miss.
                ServiceError::NotFound(_) => {
                    service_error(ServiceError::Auth("unknown user".to_string()))
                }
                other => service_error(other),
            })?;

        Ok(AuthUser(user))
    }
}
