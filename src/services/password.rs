//! Credential hashing and verification (bcrypt).
//!
//! Plaintext passwords only ever pass through these functions; they are not
//! stored or logged anywhere.

use anyhow::Context;

/// bcrypt only reads this many bytes of input; anything past it would be ignored.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a plaintext password with a fresh random salt.
///
/// Two calls with the same input produce different hashes. Fails on an
/// invalid cost, a plaintext longer than [`MAX_PASSWORD_BYTES`] or a salt
/// source failure, none of which is retried.
pub fn hash_password(plaintext: &str, cost: u32) -> anyhow::Result<String> {
    if plaintext.len() > MAX_PASSWORD_BYTES {
        anyhow::bail!("Password exceeds {MAX_PASSWORD_BYTES} bytes");
    }
    bcrypt::hash(plaintext, cost).context("Failed to hash password")
}

/// Check a plaintext password against a stored bcrypt hash.
///
/// A stored value that is not a well-formed bcrypt hash is a mismatch, not an
/// error. So is a plaintext longer than [`MAX_PASSWORD_BYTES`]: it could never
/// have been hashed, and bcrypt would otherwise compare only its prefix.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    if plaintext.len() > MAX_PASSWORD_BYTES {
        return false;
    }
    match bcrypt::verify(plaintext, stored_hash) {
        Ok(valid) => valid,
        Err(e) => {
            tracing::debug!("stored password hash rejected: {e}");
            false
        }
    }
}

/// Same as [`hash_password`] but runs on the blocking pool so bcrypt's work
/// factor does not stall the async executor.
pub async fn hash_password_blocking(plaintext: String, cost: u32) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&plaintext, cost))
        .await
        .context("Password hashing task panicked")?
}

/// Blocking-pool variant of [`verify_password`].
pub async fn verify_password_blocking(plaintext: String, stored_hash: String) -> bool {
    tokio::task::spawn_blocking(move || verify_password(&plaintext, &stored_hash))
        .await
        .unwrap_or(false)
}
