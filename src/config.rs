use std::env;

/// Longest session lifetime accepted from configuration (one year).
pub const MAX_JWT_EXPIRY_SECONDS: u64 = 365 * 24 * 60 * 60;

/// bcrypt refuses costs outside this range.
pub fn validate_bcrypt_cost(cost: u32) -> anyhow::Result<u32> {
    if !(4..=31).contains(&cost) {
        anyhow::bail!("BCRYPT_COST must be between 4 and 31, got {cost}");
    }
    Ok(cost)
}

/// Process configuration, read once at startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub bcrypt_cost: u32,
    pub auth_cookie_name: String,
    pub cookie_secure: bool,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = required(&lookup, "JWT_SECRET")?;
        if jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let bcrypt_cost = validate_bcrypt_cost(
            lookup("BCRYPT_COST").unwrap_or_else(|| "12".into()).parse()?,
        )?;

        let jwt_expiry_seconds: u64 = lookup("JWT_EXPIRY_SECONDS")
            .unwrap_or_else(|| "86400".into())
            .parse()?;
        if jwt_expiry_seconds == 0 {
            anyhow::bail!("JWT_EXPIRY_SECONDS must be positive");
        }
        if jwt_expiry_seconds > MAX_JWT_EXPIRY_SECONDS {
            anyhow::bail!(
                "JWT_EXPIRY_SECONDS must be at most {MAX_JWT_EXPIRY_SECONDS}, got {jwt_expiry_seconds}"
            );
        }

        Ok(Self {
            database_url: required(&lookup, "DATABASE_URL")?,
            jwt_secret,
            jwt_expiry_seconds,
            bcrypt_cost,
            auth_cookie_name: lookup("AUTH_COOKIE_NAME")
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "auth-token".into()),
            cookie_secure: lookup("COOKIE_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
                .unwrap_or(false),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: lookup("PORT").unwrap_or_else(|| "8080".into()).parse()?,
            app_base_url: lookup("APP_BASE_URL").unwrap_or_else(|| "http://localhost:3000".into()),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> anyhow::Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).ok_or_else(|| anyhow::anyhow!("Missing required env var: {}", key))
}
