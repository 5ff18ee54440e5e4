pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Extension, Router,
};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use middleware::auth::SessionAuth;
use services::token::TokenService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    /// Hash checked on logins for unknown emails.
    pub decoy_hash: Arc<str>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let tokens = Arc::new(TokenService::new(&config.jwt_secret, config.jwt_expiry_seconds)?);
        let decoy_hash = Arc::from(services::auth::decoy_hash(config.bcrypt_cost)?);
        Ok(Self { db, config: Arc::new(config), tokens, decoy_hash })
    }
}

pub fn build_router(state: AppState) -> Router {
    let session_auth = SessionAuth::new(state.tokens.clone(), &state.config.auth_cookie_name);

    // Credentialed CORS for the portal front-end; localhost is always allowed for development.
    let base = state.config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        o == base || o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1")
    });
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .allow_origin(cors_origin);

    Router::new()
        .route("/health", get(routes::health::health_check))
        // Auth
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/change-password", post(routes::auth::change_password))
        // Accounts
        .route("/users", get(routes::users::list_users).post(routes::users::create_user))
        .layer(Extension(session_auth))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
