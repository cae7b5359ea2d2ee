use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use service::auth::TelegramLogin;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::schemas::{ApiResponse, AppState, ErrorResponse, service_error};

/// Signed login payload posted by Telegram's login widget
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct TelegramLoginRequest {
    /// Telegram user id
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub photo_url: Option<String>,
    /// Unix timestamp Telegram signed the payload at
    pub auth_date: i64,
    /// Hex HMAC-SHA256 over the data-check string
    pub hash: String,
}

impl From<TelegramLoginRequest> for TelegramLogin {
    fn from(request: TelegramLoginRequest) -> Self {
        Self {
            id: request.id,
            first_name: request.first_name,
            last_name: request.last_name,
            username: request.username,
            photo_url: request.photo_url,
            auth_date: request.auth_date,
            hash: request.hash,
        }
    }
}

/// Issued access token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    /// Bearer token (header.payload.signature)
    pub access_token: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user_id: i32,
}

/// Verify a Telegram login payload and issue an access token
#[utoipa::path(
    post,
    path = "/api/v1/auth/telegram",
    tag = "auth",
    request_body = TelegramLoginRequest,
    responses(
        (status = 200, description = "Login verified, token issued", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Signature invalid or expired", body = ErrorResponse),
        (status = 403, description = "User is deactivated", body = ErrorResponse)
    )
)]
#[instrument(skip(state, request), fields(telegram_id = request.id))]
pub async fn telegram_login(
    State(state): State<AppState>,
    Json(request): Json<TelegramLoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let login: TelegramLogin = request.into();
    let now = Utc::now().timestamp();

    service::auth::verify_telegram_login(&login, &state.config.bot_token, now)
        .map_err(service_error)?;

    let user = service::users::register_or_login(&state.db, &login)
        .await
        .map_err(service_error)?;

    let access_token = service::auth::issue_token(
        state.config.token_secret.as_bytes(),
        user.id,
        now,
        state.config.token_ttl_secs,
    );

    info!(user_id = user.id, "issued access token");
    Ok(Json(ApiResponse::new(
        TokenResponse {
            access_token,
            expires_in: state.config.token_ttl_secs,
            user_id: user.id,
        },
        "Login successful",
    )))
}
