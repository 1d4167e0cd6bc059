//! Database initialization and storage collaborators.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses this module to create the shared SQLx pool and enforce schema
//! migrations before accepting traffic. Each submodule exposes a storage trait
//! plus its Postgres implementation; handlers and services only see the trait.
//!
//! ERROR HANDLING
//! ==============
//! Stores report raw failures through [`StoreError`]. A unique-constraint
//! violation is surfaced with the constraint name taken from the database's
//! own error metadata so callers never have to inspect message text.

pub mod notes;
pub mod sessions;
pub mod users;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no matching record")]
    NotFound,
    #[error("unique constraint {constraint} violated")]
    UniqueViolation { constraint: String },
    #[error("database error: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => Self::UniqueViolation {
                constraint: db_err.constraint().unwrap_or_default().to_owned(),
            },
            other => Self::Db(other),
        }
    }
}

/// Initialize the `PostgreSQL` connection pool and run migrations.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}
