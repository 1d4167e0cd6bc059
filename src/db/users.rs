//! User records (the credential store).

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::StoreError;

/// Name of the unique constraint guarding `users.email`.
pub const EMAIL_CONSTRAINT: &str = "users_uc_email";

/// A stored identity. Mirrors the `users` table.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// PHC-format password hash.
    pub password_hash: String,
    pub created: OffsetDateTime,
}

/// Persistence for identities. Implementations report raw failures only;
/// classification into credential errors belongs to the verifier.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new identity, returning its id.
    ///
    /// # Errors
    ///
    /// [`StoreError::UniqueViolation`] naming [`EMAIL_CONSTRAINT`] when the
    /// email is already taken.
    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> Result<Uuid, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no identity has this id.
    async fn get(&self, id: Uuid) -> Result<User, StoreError>;

    /// Fetch the `(id, password_hash)` pair used to authenticate an email.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no identity has this email.
    async fn authentication_record(&self, email: &str) -> Result<(Uuid, String), StoreError>;

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError>;

    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no identity has this id.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, name: &str, email: &str, password_hash: &str) -> Result<Uuid, StoreError> {
        let row = sqlx::query(
            r"INSERT INTO users (name, email, hashed_password, created)
              VALUES ($1, $2, $3, now())
              RETURNING id",
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn get(&self, id: Uuid) -> Result<User, StoreError> {
        let row = sqlx::query("SELECT id, name, email, hashed_password, created FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;

        Ok(User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("hashed_password"),
            created: row.get("created"),
        })
    }

    async fn authentication_record(&self, email: &str) -> Result<(Uuid, String), StoreError> {
        let row = sqlx::query("SELECT id, hashed_password FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound)?;
        Ok((row.get("id"), row.get("hashed_password")))
    }

    async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT EXISTS(SELECT true FROM users WHERE id = $1) AS present")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("present"))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET hashed_password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
