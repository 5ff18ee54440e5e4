use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::ApiError,
    middleware::auth::AdminUser,
    models::{
        envelope::ApiResponse,
        user::{CreateUserRequest, UserProfile},
    },
    services::users::UserService,
    AppState,
};

/// List portal accounts (admin only).
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>, ApiError> {
    let users = UserService::list(&state.db).await?;
    Ok(Json(ApiResponse::ok(users)))
}

/// Create a portal account (admin only).
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserProfile>>), ApiError> {
    let created = UserService::create(&state.db, body, state.config.bcrypt_cost).await?;
    tracing::info!(created_by = %admin.0.id, user_id = %created.id, "account created via API");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}
