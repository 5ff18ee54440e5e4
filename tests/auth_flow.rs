use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use bizdesk_api::{
    build_router,
    config::Config,
    models::{auth::IdentityClaim, user::UserRole},
    AppState,
};

const SECRET: &str = "integration-test-secret";

/// Router over a lazily-connected pool; none of these requests reach the database.
fn test_state() -> AppState {
    let config = Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/bizdesk_test".into()),
        "JWT_SECRET" => Some(SECRET.into()),
        "JWT_EXPIRY_SECONDS" => Some("900".into()),
        "BCRYPT_COST" => Some("4".into()),
        _ => None,
    })
    .unwrap();
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .unwrap();
    AppState::new(pool, config).unwrap()
}

fn claim(role: UserRole) -> IdentityClaim {
    IdentityClaim {
        id: "0b7e4d7a-58c3-4f0e-9a57-3c6f2d1e8b90".into(),
        email: "ops@example.com".into(),
        role,
    }
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Option<String>, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, cookie, body)
}

fn get(uri: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(uri)
}

#[tokio::test]
async fn me_without_token_is_unauthorized() {
    let app = build_router(test_state());
    let (status, _, body) = send(app, get("/auth/me").body(Body::empty()).unwrap()).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "error": "Unauthorized" }));
}

#[tokio::test]
async fn me_with_bearer_token_returns_identity() {
    let state = test_state();
    let token = state.tokens.issue(&claim(UserRole::Accountant)).unwrap().token;
    let app = build_router(state);

    let req = get("/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["email"], json!("ops@example.com"));
    assert_eq!(body["data"]["role"], json!("ACCOUNTANT"));
}

#[tokio::test]
async fn me_accepts_cookie_and_query_token() {
    let state = test_state();
    let token = state.tokens.issue(&claim(UserRole::Admin)).unwrap().token;
    let app = build_router(state);

    let req = get("/auth/me")
        .header(header::COOKIE, format!("auth-token={token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);

    let req = get(&format!("/auth/me?token={token}")).body(Body::empty()).unwrap();
    let (status, _, body) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], json!("ADMIN"));
}

#[tokio::test]
async fn invalid_cookie_is_not_rescued_by_header() {
    let state = test_state();
    let token = state.tokens.issue(&claim(UserRole::Admin)).unwrap().token;
    let app = build_router(state);

    let req = get("/auth/me")
        .header(header::COOKIE, "auth-token=invalid.jwt.token")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app, req).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_and_garbage_tokens_are_unauthorized() {
    let state = test_state();
    let expired = state
        .tokens
        .issue_at(&claim(UserRole::Admin), Utc::now() - Duration::hours(1))
        .unwrap()
        .token;
    let app = build_router(state);

    for token in [expired.as_str(), "invalid.jwt.token", "garbage"] {
        let req = get("/auth/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(app.clone(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token {token:?}");
        assert_eq!(body["success"], json!(false));
    }
}

#[tokio::test]
async fn users_endpoint_requires_admin() {
    let state = test_state();
    let token = state.tokens.issue(&claim(UserRole::Accountant)).unwrap().token;
    let app = build_router(state);

    let req = get("/users")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "success": false, "error": "Forbidden" }));

    let (status, _, _) = send(app, get("/users").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = build_router(test_state());
    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .body(Body::empty())
        .unwrap();
    let (status, cookie, body) = send(app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
    let cookie = cookie.expect("Set-Cookie header");
    assert!(cookie.starts_with("auth-token=;"));
    assert!(cookie.contains("Max-Age=0"));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn login_with_blank_fields_is_bad_request() {
    let app = build_router(test_state());
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"email":"  ","password":""}"#))
        .unwrap();
    let (status, cookie, body) = send(app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(cookie.is_none());
    assert_eq!(body["success"], json!(false));
}
