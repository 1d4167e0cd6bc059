//! Session load-and-save stage and the `Session` extractor.
//!
//! The save step runs exactly once on every exit path. A panic from further
//! down is caught here only long enough to persist the session, then resumed
//! so the outermost recovery stage handles it. The panicking response never
//! reaches the client, so that save never commits under a newly issued token.

use std::panic::AssertUnwindSafe;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use futures::FutureExt;

use crate::error::AppError;
use crate::services::session::{SESSION_COOKIE_NAME, Session};
use crate::state::AppState;

pub async fn load_and_save(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar.get(SESSION_COOKIE_NAME).map(Cookie::value);
    let session = state.sessions.load(token).await?;
    req.extensions_mut().insert(session.clone());

    let mut response = match AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            if let Err(e) = state.sessions.save_without_cookie(&session).await {
                tracing::error!(error = %e, "session save failed after panic");
            }
            std::panic::resume_unwind(panic);
        }
    };

    if let Some(cookie) = state.sessions.save(&session).await? {
        let value = HeaderValue::from_str(&cookie.to_string()).map_err(|e| AppError::Unrecoverable(e.to_string()))?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response.headers_mut().append(header::VARY, HeaderValue::from_static("Cookie"));
    Ok(response)
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Unrecoverable("session stage missing from middleware chain".into()))
    }
}
