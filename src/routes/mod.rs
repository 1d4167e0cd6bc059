//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Application routes are split into a public group (dynamic chain) and a
//! protected group (dynamic chain plus login guard). Static assets, the
//! health check and the 404 fallback sit outside both and only pass through
//! the standard chain, so they never touch the session store.

pub mod notes;
pub mod pages;
pub mod users;

use std::path::Path;

use axum::Router;
use axum::routing::{get, post};
use tower_http::services::ServeDir;

use crate::error::AppError;
use crate::middleware::Chain;
use crate::state::AppState;

/// Build the complete application router.
pub fn app(state: AppState, static_dir: &Path) -> Router {
    let public = Router::new()
        .route("/", get(pages::home))
        .route("/about", get(pages::about))
        .route("/note/view/{id}", get(notes::view))
        .route("/user/signup", get(users::signup_form).post(users::signup))
        .route("/user/login", get(users::login_form).post(users::login));

    let protected = Router::new()
        .route("/note/create", get(notes::create_form).post(notes::create))
        .route("/user/logout", post(users::logout))
        .route("/account/view", get(users::account))
        .route("/account/password/update", get(users::password_form).post(users::password_update));

    let router = Router::new()
        .merge(Chain::dynamic().then(public, &state))
        .merge(Chain::protected().then(protected, &state))
        .route("/health_check", get(health_check))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(not_found);

    Chain::standard().then(router, &state).with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn not_found() -> AppError {
    AppError::NoSuchRecord
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
