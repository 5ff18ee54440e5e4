use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts, HeaderMap},
};

use crate::{
    error::ApiError,
    models::{auth::AuthenticatedUser, user::UserRole},
    services::token::TokenService,
};

/// Query parameter consulted last when looking for a session token.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// Extension type carrying the token service and cookie name through request extensions.
#[derive(Clone)]
pub struct SessionAuth {
    pub tokens: Arc<TokenService>,
    pub cookie_name: Arc<str>,
}

impl SessionAuth {
    pub fn new(tokens: Arc<TokenService>, cookie_name: &str) -> Self {
        Self { tokens, cookie_name: Arc::from(cookie_name) }
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<SessionAuth>()
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("session auth not configured")))?;

        let token = extract_token(parts, &auth.cookie_name).ok_or(ApiError::Unauthorized)?;
        let identity = auth.tokens.verify(&token).ok_or(ApiError::Unauthorized)?;

        Ok(AuthenticatedUser(identity))
    }
}

/// Extractor that only admits `ADMIN` sessions.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        require_role(&user, &[UserRole::Admin])?;
        Ok(AdminUser(user))
    }
}

/// Admit the user only if their role is listed. Anything not listed is refused.
pub fn require_role(user: &AuthenticatedUser, allowed: &[UserRole]) -> Result<(), ApiError> {
    if allowed.contains(&user.role()) {
        Ok(())
    } else {
        tracing::debug!(user_id = %user.0.id, role = %user.role(), "role not permitted");
        Err(ApiError::Forbidden)
    }
}

/// Find the session token: cookie, then `Authorization: Bearer`, then `?token=`.
///
/// The first source present wins even if its token later fails verification.
pub fn extract_token(parts: &Parts, cookie_name: &str) -> Option<String> {
    if let Some(token) = get_cookie(&parts.headers, cookie_name) {
        return Some(token);
    }

    if let Some(token) = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(token.to_string());
    }

    Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .ok()
        .and_then(|Query(mut params)| params.remove(TOKEN_QUERY_PARAM))
        .filter(|t| !t.is_empty())
}

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|part| {
            part.trim()
                .strip_prefix(prefix.as_str())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
}
