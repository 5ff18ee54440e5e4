use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::{
        auth::IdentityClaim,
        user::{LoginResponse, User, UserProfile},
    },
    services::{
        password::{
            hash_password, hash_password_blocking, verify_password_blocking, MAX_PASSWORD_BYTES,
        },
        token::TokenService,
    },
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Plaintext hashed once at startup; logins for unknown emails are checked against it.
const DECOY_PASSWORD: &str = "bizdesk-decoy-credential";

/// Emails are stored and compared lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Length rules for any password about to be hashed.
pub fn validate_new_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ApiError::BadRequest(format!(
            "Password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

/// bcrypt hash of a throwaway password at the configured cost.
pub fn decoy_hash(cost: u32) -> anyhow::Result<String> {
    hash_password(DECOY_PASSWORD, cost)
}

pub struct AuthService;

impl AuthService {
    /// Check email + password and issue a session token.
    pub async fn login(
        pool: &PgPool,
        tokens: &TokenService,
        decoy_hash: &str,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let email = normalize_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(ApiError::BadRequest("Email and password are required".into()));
        }

        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, name, role, is_active, created_at, updated_at
             FROM users WHERE email = $1",
        )
        .bind(&email)
        .fetch_optional(pool)
        .await?;

        Self::authenticate(user, password, tokens, decoy_hash).await
    }

    /// Decide a login once the account lookup is done.
    ///
    /// Unknown email, wrong password, disabled account and an unreadable role
    /// all return the same `InvalidCredentials`. An unknown email still runs
    /// one bcrypt check (against `decoy_hash`) so it costs as much as a known one.
    pub async fn authenticate(
        user: Option<User>,
        password: &str,
        tokens: &TokenService,
        decoy_hash: &str,
    ) -> Result<LoginResponse, ApiError> {
        let Some(user) = user else {
            verify_password_blocking(password.to_string(), decoy_hash.to_string()).await;
            tracing::info!("login rejected: unknown email");
            return Err(ApiError::InvalidCredentials);
        };

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await {
            tracing::info!(user_id = %user.id, "login rejected: password mismatch");
            return Err(ApiError::InvalidCredentials);
        }
        if !user.is_active {
            tracing::info!(user_id = %user.id, "login rejected: account inactive");
            return Err(ApiError::InvalidCredentials);
        }

        let profile = UserProfile::try_from(user).map_err(|e| {
            tracing::warn!("login rejected: {e}");
            ApiError::InvalidCredentials
        })?;

        let issued = tokens.issue(&IdentityClaim {
            id: profile.id.to_string(),
            email: profile.email.clone(),
            role: profile.role,
        })?;

        tracing::info!(user_id = %profile.id, role = %profile.role, "login succeeded");

        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user: profile,
        })
    }

    /// Replace the caller's password after re-checking the current one.
    pub async fn change_password(
        pool: &PgPool,
        user_id: &str,
        current_password: &str,
        new_password: &str,
        cost: u32,
    ) -> Result<(), ApiError> {
        validate_new_password(new_password)?;
        let user_id: Uuid = user_id.parse().map_err(|_| ApiError::Unauthorized)?;

        let stored: String = sqlx::query_scalar(
            "SELECT password_hash FROM users WHERE id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::Unauthorized)?;

        let new_hash = Self::replacement_hash(stored, current_password, new_password, cost).await?;
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(new_hash)
            .bind(user_id)
            .execute(pool)
            .await?;

        tracing::info!(%user_id, "password changed");
        Ok(())
    }

    /// Hash `new_password` only if `current_password` matches the stored hash.
    pub async fn replacement_hash(
        stored_hash: String,
        current_password: &str,
        new_password: &str,
        cost: u32,
    ) -> Result<String, ApiError> {
        validate_new_password(new_password)?;
        if !verify_password_blocking(current_password.to_string(), stored_hash).await {
            return Err(ApiError::InvalidCredentials);
        }
        Ok(hash_password_blocking(new_password.to_string(), cost).await?)
    }
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;
    use chrono::Utc;

    use super::*;
    use crate::{models::user::UserRole, services::password::verify_password};

    const COST: u32 = 4;

    fn tokens() -> TokenService {
        TokenService::new("auth-service-test-secret", 900).unwrap()
    }

    fn account(password: &str, role: &str, is_active: bool) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "clerk@example.com".into(),
            password_hash: hash_password(password, COST).unwrap(),
            name: "Clerk".into(),
            role: role.into(),
            is_active,
            created_at: now,
            updated_at: now,
        }
    }

    async fn body_of(err: ApiError) -> (axum::http::StatusCode, String) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Example.COM "), "jane.doe@example.com");
        assert_eq!(normalize_email("   "), "");
    }

    #[test]
    fn test_validate_new_password() {
        assert!(validate_new_password("longenough").is_ok());
        assert!(validate_new_password(&"x".repeat(MAX_PASSWORD_BYTES)).is_ok());
        assert!(matches!(validate_new_password("short"), Err(ApiError::BadRequest(_))));
        assert!(matches!(
            validate_new_password(&"x".repeat(MAX_PASSWORD_BYTES + 1)),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_success_issues_verifiable_token() {
        let svc = tokens();
        let user = account("ledger-pass-1", "ACCOUNTANT", true);
        let id = user.id;

        let res = AuthService::authenticate(Some(user), "ledger-pass-1", &svc, &decoy_hash(COST).unwrap())
            .await
            .unwrap();

        assert_eq!(res.user.id, id);
        assert_eq!(res.user.role, UserRole::Accountant);
        let claim = svc.verify(&res.token).unwrap();
        assert_eq!(claim.id, id.to_string());
        assert_eq!(claim.email, "clerk@example.com");
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_the_same() {
        let svc = tokens();
        let decoy = decoy_hash(COST).unwrap();

        let unknown = AuthService::authenticate(None, "ledger-pass-1", &svc, &decoy)
            .await
            .unwrap_err();
        let wrong = AuthService::authenticate(
            Some(account("ledger-pass-1", "ADMIN", true)),
            "not-the-password",
            &svc,
            &decoy,
        )
        .await
        .unwrap_err();

        assert!(matches!(unknown, ApiError::InvalidCredentials));
        assert!(matches!(wrong, ApiError::InvalidCredentials));
        assert_eq!(body_of(unknown).await, body_of(wrong).await);
    }

    #[tokio::test]
    async fn test_decoy_password_never_logs_in() {
        let decoy = decoy_hash(COST).unwrap();
        let err = AuthService::authenticate(None, DECOY_PASSWORD, &tokens(), &decoy)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_inactive_account_is_generic_failure() {
        let err = AuthService::authenticate(
            Some(account("ledger-pass-1", "ADMIN", false)),
            "ledger-pass-1",
            &tokens(),
            &decoy_hash(COST).unwrap(),
        )
        .await
        .unwrap_err();

        let (status, body) = body_of(err).await;
        assert_eq!(status, axum::http::StatusCode::UNAUTHORIZED);
        assert!(body.contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_unreadable_stored_role_is_generic_failure() {
        let err = AuthService::authenticate(
            Some(account("ledger-pass-1", "MANAGER", true)),
            "ledger-pass-1",
            &tokens(),
            &decoy_hash(COST).unwrap(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_replacement_hash_requires_current_password() {
        let stored = hash_password("old-password", COST).unwrap();

        let err = AuthService::replacement_hash(stored.clone(), "guess", "new-password-1", COST)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));

        let new_hash = AuthService::replacement_hash(stored, "old-password", "new-password-1", COST)
            .await
            .unwrap();
        assert!(verify_password("new-password-1", &new_hash));
        assert!(!verify_password("old-password", &new_hash));
    }

    #[tokio::test]
    async fn test_replacement_hash_checks_new_password_length() {
        let stored = hash_password("old-password", COST).unwrap();

        let too_short = AuthService::replacement_hash(stored.clone(), "old-password", "short", COST).await;
        assert!(matches!(too_short, Err(ApiError::BadRequest(_))));

        let too_long = "p".repeat(MAX_PASSWORD_BYTES + 1);
        let rejected = AuthService::replacement_hash(stored, "old-password", &too_long, COST).await;
        assert!(matches!(rejected, Err(ApiError::BadRequest(_))));
    }
}
