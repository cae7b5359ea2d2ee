use axum::{extract::State, http::StatusCode, response::Json};
use model::entities::user;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::schemas::{ApiResponse, AppState, ErrorResponse, service_error};

/// Request body for updating the authenticated user's profile
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateUserRequest {
    pub display_name: String,
}

/// User response model
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub telegram_id: i64,
    pub display_name: String,
    pub is_active: bool,
    pub default_wallet_id: Option<i32>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            telegram_id: model.telegram_id,
            display_name: model.display_name,
            is_active: model.is_active,
            default_wallet_id: model.default_wallet_id,
        }
    }
}

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Profile retrieved successfully", body = ApiResponse<UserResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(user))]
pub async fn get_me(
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ErrorResponse>)> {
    Ok(Json(ApiResponse::new(
        UserResponse::from(user),
        "Profile retrieved successfully",
    )))
}

/// Update the authenticated user's display name
#[utoipa::path(
    put,
    path = "/api/v1/users/me",
    tag = "users",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Profile updated successfully", body = ApiResponse<UserResponse>),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let updated = service::users::update_display_name(&state.db, &user, request.display_name)
        .await
        .map_err(service_error)?;

    Ok(Json(ApiResponse::new(
        UserResponse::from(updated),
        "Profile updated successfully",
    )))
}

/// Soft-disable the authenticated user
#[utoipa::path(
    post,
    path = "/api/v1/users/me/deactivate",
    tag = "users",
    responses(
        (status = 200, description = "User deactivated", body = ApiResponse<UserResponse>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn deactivate_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<UserResponse>>, (StatusCode, Json<ErrorResponse>)> {
    let updated = service::users::deactivate(&state.db, &user)
        .await
        .map_err(service_error)?;

    info!(user_id = updated.id, "user deactivated");
    Ok(Json(ApiResponse::new(
        UserResponse::from(updated),
        "User deactivated",
    )))
}

/// Delete the authenticated user and all owned data
#[utoipa::path(
    delete,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "User deleted successfully", body = ApiResponse<String>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[instrument(skip(state, user))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ApiResponse<String>>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = user.id;
    service::users::delete_user(&state.db, &user)
        .await
        .map_err(service_error)?;

    info!(user_id, "user deleted");
    Ok(Json(ApiResponse::new(
        format!("User {user_id} deleted"),
        "User deleted successfully",
    )))
}
