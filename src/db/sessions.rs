//! Session persistence keyed by token digest.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;

use super::StoreError;

/// Persisted session state as returned by [`SessionStore::find`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub data: Map<String, Value>,
    pub expiry: OffsetDateTime,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up an unexpired session. Unknown and expired tokens both yield `None`.
    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Insert or overwrite the session stored under `token`.
    async fn commit(&self, token: &str, data: &Map<String, Value>, expiry: OffsetDateTime) -> Result<(), StoreError>;

    async fn delete(&self, token: &str) -> Result<(), StoreError>;

    /// Remove every expired session, returning how many were dropped.
    async fn delete_expired(&self) -> Result<u64, StoreError>;
}

/// Hex SHA-256 of a session token. The raw token never reaches the database.
#[must_use]
pub fn digest_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let bytes = hasher.finalize();
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn find(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        let row = sqlx::query("SELECT data, expiry FROM sessions WHERE token_hash = $1 AND expiry > now()")
            .bind(digest_token(token))
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let data = match row.get::<Value, _>("data") {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(Some(SessionRecord { data, expiry: row.get("expiry") }))
    }

    async fn commit(&self, token: &str, data: &Map<String, Value>, expiry: OffsetDateTime) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO sessions (token_hash, data, expiry)
              VALUES ($1, $2, $3)
              ON CONFLICT (token_hash) DO UPDATE SET data = EXCLUDED.data, expiry = EXCLUDED.expiry",
        )
        .bind(digest_token(token))
        .bind(Value::Object(data.clone()))
        .bind(expiry)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(digest_token(token))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expiry <= now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_64_hex_chars() {
        let digest = digest_token("abc");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn digest_known_vector() {
        assert_eq!(
            digest_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn digest_differs_per_token() {
        assert_ne!(digest_token("token-a"), digest_token("token-b"));
    }
}
