//! Process configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Everything here is read once in `main` before the router is built and is
//! immutable afterwards. That includes the password-hash work factor: changing
//! it requires a restart, and existing hashes keep verifying because the PHC
//! string records the parameters it was produced with.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_LIFETIME_SECS: u64 = 12 * 60 * 60;
pub const DEFAULT_SESSION_CLEANUP_INTERVAL_SECS: u64 = 300;
/// Upper bound on session lifetime. Keeps `now + lifetime` representable.
pub const MAX_SESSION_LIFETIME_SECS: u64 = 400 * 24 * 60 * 60;
pub const DEFAULT_PASSWORD_HASH_COST: u32 = 12;
pub const DEFAULT_STATIC_DIR: &str = "ui/static";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub session_lifetime: Duration,
    pub session_cleanup_interval: Duration,
    /// Marks the session cookie `Secure`. Only disable for plain-HTTP local development.
    pub cookie_secure: bool,
    /// Argon2 iteration count applied to every new password hash.
    pub password_hash_cost: u32,
    pub static_dir: PathBuf,
}

impl Config {
    /// Build the typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    ///
    /// Optional:
    /// - `PORT`: default 4000
    /// - `DB_MAX_CONNECTIONS`: default 5
    /// - `SESSION_LIFETIME_SECS`: default 43200 (12 hours), 1 to 400 days
    /// - `SESSION_CLEANUP_INTERVAL_SECS`: default 300, at least 1
    /// - `COOKIE_SECURE`: default true
    /// - `PASSWORD_HASH_COST`: default 12
    /// - `STATIC_DIR`: default `ui/static`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if `DATABASE_URL` is unset or empty, and
    /// [`ConfigError::Invalid`] if a session duration is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            session_lifetime: session_lifetime(env_parse("SESSION_LIFETIME_SECS", DEFAULT_SESSION_LIFETIME_SECS))?,
            session_cleanup_interval: cleanup_interval(env_parse(
                "SESSION_CLEANUP_INTERVAL_SECS",
                DEFAULT_SESSION_CLEANUP_INTERVAL_SECS,
            ))?,
            cookie_secure: env_bool("COOKIE_SECURE").unwrap_or(true),
            password_hash_cost: env_parse("PASSWORD_HASH_COST", DEFAULT_PASSWORD_HASH_COST),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STATIC_DIR)),
        })
    }
}

pub(crate) fn session_lifetime(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 || secs > MAX_SESSION_LIFETIME_SECS {
        return Err(ConfigError::Invalid {
            key: "SESSION_LIFETIME_SECS",
            reason: format!("{secs} is outside 1..={MAX_SESSION_LIFETIME_SECS}"),
        });
    }
    Ok(Duration::from_secs(secs))
}

pub(crate) fn cleanup_interval(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid { key: "SESSION_CLEANUP_INTERVAL_SECS", reason: "must be at least 1".into() });
    }
    Ok(Duration::from_secs(secs))
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
