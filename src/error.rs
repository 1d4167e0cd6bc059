//! Application error taxonomy.
//!
//! Lower layers report raw failures ([`StoreError`], [`HashError`]); the
//! credential verifier is the only place that turns those into the
//! credential-specific variants below. Anything unexpected collapses into
//! [`AppError::Unrecoverable`], which is logged with full context and answered
//! with a bare 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::db::StoreError;
use crate::services::password::HashError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("no matching record found")]
    NoSuchRecord,
    #[error("duplicate identity")]
    DuplicateIdentity,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("forbidden")]
    Forbidden,
    #[error("unrecoverable: {0}")]
    Unrecoverable(String),
}

impl AppError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NoSuchRecord => StatusCode::NOT_FOUND,
            Self::DuplicateIdentity => StatusCode::CONFLICT,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unrecoverable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NoSuchRecord,
            other => Self::Unrecoverable(other.to_string()),
        }
    }
}

impl From<HashError> for AppError {
    fn from(err: HashError) -> Self {
        Self::Unrecoverable(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Unrecoverable(cause) = &self {
            tracing::error!(error = %cause, "request failed");
        }
        // Only the canonical reason phrase reaches the client.
        let body = status.canonical_reason().unwrap_or("Error");
        (status, body).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
