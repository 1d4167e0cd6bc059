//! Credential verifier: signup, login and password change.
//!
//! ERROR HANDLING
//! ==============
//! This is the single place raw store and hasher failures are classified:
//! - a unique violation on the email constraint becomes `DuplicateIdentity`;
//! - an unknown email and a wrong password both become `InvalidCredentials`,
//!   so a caller cannot tell which half failed;
//! - everything else is `Unrecoverable`.

use std::sync::Arc;

use uuid::Uuid;

use super::password::PasswordHasher;
use crate::db::StoreError;
use crate::db::users::{EMAIL_CONSTRAINT, UserStore};
use crate::error::AppError;

#[derive(Clone)]
pub struct Credentials {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
}

impl Credentials {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>, hasher: PasswordHasher) -> Self {
        Self { users, hasher }
    }

    /// Hash the password and persist a new identity.
    ///
    /// Inputs are expected to have passed form validation already.
    ///
    /// # Errors
    ///
    /// [`AppError::DuplicateIdentity`] if the email is taken, otherwise
    /// [`AppError::Unrecoverable`].
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<Uuid, AppError> {
        let hash = self.hasher.hash_blocking(password).await?;
        match self.users.insert(name, email, &hash).await {
            Ok(id) => {
                tracing::info!(user_id = %id, "identity created");
                Ok(id)
            }
            Err(StoreError::UniqueViolation { constraint }) if constraint == EMAIL_CONSTRAINT => {
                Err(AppError::DuplicateIdentity)
            }
            Err(e) => Err(AppError::Unrecoverable(e.to_string())),
        }
    }

    /// Verify an email/password pair and return the identity's id.
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidCredentials`] for an unknown email or a wrong
    /// password alike, otherwise [`AppError::Unrecoverable`].
    pub async fn login(&self, email: &str, password: &str) -> Result<Uuid, AppError> {
        let (id, hash) = match self.users.authentication_record(email).await {
            Ok(record) => record,
            Err(StoreError::NotFound) => return Err(AppError::InvalidCredentials),
            Err(e) => return Err(AppError::Unrecoverable(e.to_string())),
        };

        if self.hasher.verify_blocking(password, &hash).await? {
            Ok(id)
        } else {
            Err(AppError::InvalidCredentials)
        }
    }

    /// Replace the password of `id` after checking the current one.
    ///
    /// # Errors
    ///
    /// [`AppError::InvalidCredentials`] if `current` does not match,
    /// [`AppError::NoSuchRecord`] if the identity is gone, otherwise
    /// [`AppError::Unrecoverable`].
    pub async fn change_password(&self, id: Uuid, current: &str, new: &str) -> Result<(), AppError> {
        let user = self.users.get(id).await?;

        if !self.hasher.verify_blocking(current, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let hash = self.hasher.hash_blocking(new).await?;
        self.users.update_password(id, &hash).await?;
        tracing::info!(user_id = %id, "password changed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
