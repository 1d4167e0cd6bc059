//! Note records.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::StoreError;

const LATEST_LIMIT: i64 = 10;

#[derive(Debug, Clone)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub created: OffsetDateTime,
    pub expires: OffsetDateTime,
}

impl Note {
    fn from_row(row: &PgRow) -> Self {
        Self {
            id: row.get("id"),
            title: row.get("title"),
            content: row.get("content"),
            created: row.get("created"),
            expires: row.get("expires"),
        }
    }
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert a note that expires `expires_days` from now.
    async fn insert(&self, title: &str, content: &str, expires_days: i32) -> Result<Uuid, StoreError>;

    /// Fetch an unexpired note.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the note is missing or has expired.
    async fn get(&self, id: Uuid) -> Result<Note, StoreError>;

    /// The ten most recently created unexpired notes, newest first.
    async fn latest(&self) -> Result<Vec<Note>, StoreError>;
}

pub struct PgNoteStore {
    pool: PgPool,
}

impl PgNoteStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteStore for PgNoteStore {
    async fn insert(&self, title: &str, content: &str, expires_days: i32) -> Result<Uuid, StoreError> {
        let row = sqlx::query(
            r"INSERT INTO notes (title, content, created, expires)
              VALUES ($1, $2, now(), now() + make_interval(days => $3))
              RETURNING id",
        )
        .bind(title)
        .bind(content)
        .bind(expires_days)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("id"))
    }

    async fn get(&self, id: Uuid) -> Result<Note, StoreError> {
        let row = sqlx::query(
            r"SELECT id, title, content, created, expires
              FROM notes
              WHERE expires > now() AND id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound)?;
        Ok(Note::from_row(&row))
    }

    async fn latest(&self) -> Result<Vec<Note>, StoreError> {
        let rows = sqlx::query(
            r"SELECT id, title, content, created, expires
              FROM notes
              WHERE expires > now()
              ORDER BY created DESC
              LIMIT $1",
        )
        .bind(LATEST_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(Note::from_row).collect())
    }
}
