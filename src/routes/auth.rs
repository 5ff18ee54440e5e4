use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    error::ApiError,
    models::{
        auth::{AuthenticatedUser, IdentityClaim},
        envelope::ApiResponse,
        user::{ChangePasswordRequest, LoginRequest},
    },
    services::auth::AuthService,
    AppState,
};

/// Build the `Set-Cookie` value carrying the session token. `max_age` 0 clears it.
pub fn session_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!("{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let res = AuthService::login(
        &state.db,
        &state.tokens,
        &state.decoy_hash,
        &body.email,
        &body.password,
    )
    .await?;

    let cookie = session_cookie(
        &state.config.auth_cookie_name,
        &res.token,
        state.tokens.ttl().num_seconds(),
        state.config.cookie_secure,
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::ok(res)),
    )
        .into_response())
}

/// Tokens are stateless, so logout only clears the cookie.
pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = session_cookie(&state.config.auth_cookie_name, "", 0, state.config.cookie_secure);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::empty()),
    )
        .into_response()
}

pub async fn me(user: AuthenticatedUser) -> Json<ApiResponse<IdentityClaim>> {
    Json(ApiResponse::ok(user.0))
}

pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    AuthService::change_password(
        &state.db,
        &user.0.id,
        &body.current_password,
        &body.new_password,
        state.config.bcrypt_cost,
    )
    .await?;

    Ok(Json(ApiResponse::empty()))
}
