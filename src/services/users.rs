use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::user::{CreateUserRequest, User, UserProfile},
    services::{
        auth::{normalize_email, validate_new_password},
        password::hash_password_blocking,
    },
};

pub struct UserService;

impl UserService {
    pub async fn list(pool: &PgPool) -> Result<Vec<UserProfile>, ApiError> {
        let rows = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, name, role, is_active, created_at, updated_at
             FROM users ORDER BY role, name",
        )
        .fetch_all(pool)
        .await?;

        // A row with a role outside the closed set is skipped rather than failing the listing.
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id;
                UserProfile::try_from(row)
                    .map_err(|e| tracing::warn!(user_id = %id, "skipping user: {e}"))
                    .ok()
            })
            .collect())
    }

    pub async fn create(
        pool: &PgPool,
        req: CreateUserRequest,
        cost: u32,
    ) -> Result<UserProfile, ApiError> {
        let email = normalize_email(&req.email);
        let name = req.name.trim().to_string();
        validate_new_user(&email, &name, &req.password)?;

        let password_hash = hash_password_blocking(req.password, cost).await?;

        let row = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, password_hash, name, role)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (email) DO NOTHING
             RETURNING id, email, password_hash, name, role, is_active, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(password_hash)
        .bind(&name)
        .bind(req.role.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::Conflict(format!("A user with email {email} already exists")))?;

        tracing::info!(user_id = %row.id, role = %req.role, "user created");
        Ok(UserProfile::try_from(row)?)
    }
}

fn validate_new_user(email: &str, name: &str, password: &str) -> Result<(), ApiError> {
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(ApiError::BadRequest("A valid email is required".into()));
    }
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".into()));
    }
    validate_new_password(password)
}
