//! Session token issuing and verification (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::Deserialize;

use crate::models::{
    auth::{Claims, IdentityClaim},
    user::UserRole,
};

/// Why a token was refused. Never shown to clients; `verify` collapses all of these.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("token expired")]
    Expired,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("unknown role {0:?}")]
    UnknownRole(String),
}

/// A freshly signed token together with its expiry instant.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Payload shape accepted on the way in. Role stays a string until checked.
#[derive(Deserialize)]
struct IncomingClaims {
    id: String,
    email: String,
    role: String,
}

/// Signs and checks session tokens with a secret fixed at construction.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl_seconds: u64) -> anyhow::Result<Self> {
        let ttl = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| anyhow::anyhow!("token lifetime of {ttl_seconds}s is out of range"))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, identity: &IdentityClaim) -> anyhow::Result<IssuedToken> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue with an explicit issued-at instant. Same inputs and secret give the same token.
    pub fn issue_at(
        &self,
        identity: &IdentityClaim,
        issued_at: DateTime<Utc>,
    ) -> anyhow::Result<IssuedToken> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("token expiry overflows the representable range"))?;
        let claims = Claims {
            id: identity.id.clone(),
            email: identity.email.clone(),
            role: identity.role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Total check: any defect in the token yields `None`.
    pub fn verify(&self, token: &str) -> Option<IdentityClaim> {
        match self.decode(token) {
            Ok(identity) => Some(identity),
            Err(reason) => {
                tracing::debug!("session token rejected: {reason}");
                None
            }
        }
    }

    /// Like [`verify`](Self::verify) but keeps the rejection reason.
    pub fn decode(&self, token: &str) -> Result<IdentityClaim, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed);
        }

        let data = decode::<IncomingClaims>(token, &self.decoding, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::SignatureMismatch
                }
                _ => TokenError::Malformed,
            },
        )?;

        let IncomingClaims { id, email, role } = data.claims;
        let role: UserRole = role.parse().map_err(|_| TokenError::UnknownRole(role))?;

        Ok(IdentityClaim { id, email, role })
    }
}
