use serde::{Deserialize, Serialize};

use super::user::UserRole;

/// Identity asserted by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaim {
    pub id: String,
    pub email: String,
    pub role: UserRole,
}

/// Claims embedded in the JWT session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,    // user UUID
    pub email: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Extracted from the validated token — available via Axum extractors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub IdentityClaim);

impl AuthenticatedUser {
    pub fn role(&self) -> UserRole {
        self.0.role
    }
}
