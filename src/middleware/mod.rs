//! Request middleware pipeline.
//!
//! ARCHITECTURE
//! ============
//! A [`Chain`] is an ordered list of [`Stage`] values. [`Chain::then`] folds
//! it into a router once at startup so that stage *i* wraps stage *i+1*:
//! stages run first-to-last on the way in and last-to-first on the way out.
//!
//! Three chains exist:
//! - standard: every request, static assets and health check included;
//! - dynamic: application routes, needing session state;
//! - protected: dynamic plus the login guard.
//!
//! Order is load-bearing. CSRF validation reads the session-bound token and
//! authentication reads the session's identity, so both must sit inside the
//! session stage. Panic recovery sits outermost so that a panic anywhere is
//! caught exactly once, after the session stage has already saved.

pub mod auth;
pub mod csrf;
pub mod headers;
pub mod logging;
pub mod recover;
pub mod session;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use tower_http::catch_panic::CatchPanicLayer;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RecoverPanic,
    LogRequest,
    SecureHeaders,
    LoadAndSaveSession,
    VerifyCsrf,
    Authenticate,
    RequireAuthentication,
}

impl Stage {
    /// Wrap `router` in this stage. Layers added later run earlier.
    fn wrap(self, router: Router<AppState>, state: &AppState) -> Router<AppState> {
        match self {
            Self::RecoverPanic => router.layer(CatchPanicLayer::custom(recover::handle_panic)),
            Self::LogRequest => router.layer(from_fn(logging::log_request)),
            Self::SecureHeaders => router.layer(from_fn(headers::secure_headers)),
            Self::LoadAndSaveSession => router.layer(from_fn_with_state(state.clone(), session::load_and_save)),
            Self::VerifyCsrf => router.layer(from_fn(csrf::verify_csrf)),
            Self::Authenticate => router.layer(from_fn_with_state(state.clone(), auth::authenticate)),
            Self::RequireAuthentication => router.layer(from_fn(auth::require_authentication)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    stages: Vec<Stage>,
}

impl Chain {
    #[must_use]
    pub fn new(stages: impl Into<Vec<Stage>>) -> Self {
        Self { stages: stages.into() }
    }

    /// Panic recovery → request logging → security headers.
    #[must_use]
    pub fn standard() -> Self {
        Self::new([Stage::RecoverPanic, Stage::LogRequest, Stage::SecureHeaders])
    }

    /// Session load-and-save → CSRF → authentication context.
    #[must_use]
    pub fn dynamic() -> Self {
        Self::new([Stage::LoadAndSaveSession, Stage::VerifyCsrf, Stage::Authenticate])
    }

    /// The dynamic chain followed by the login guard.
    #[must_use]
    pub fn protected() -> Self {
        Self::dynamic().append(Stage::RequireAuthentication)
    }

    /// A new chain with `stage` as the innermost stage.
    #[must_use]
    pub fn append(&self, stage: Stage) -> Self {
        let mut stages = self.stages.clone();
        stages.push(stage);
        Self { stages }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Fold the chain around every route currently in `router`.
    pub fn then(&self, router: Router<AppState>, state: &AppState) -> Router<AppState> {
        self.stages.iter().rev().fold(router, |router, stage| stage.wrap(router, state))
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
