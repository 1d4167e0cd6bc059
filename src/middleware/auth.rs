//! Authentication context and the login guard.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::session::{AUTH_USER_KEY, FLASH_KEY, REDIRECT_AFTER_LOGIN_KEY, Session};
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/user/login";
pub const LOGIN_REQUIRED_FLASH: &str = "You must be logged in to access this page";

/// Per-request authentication fact. Never cached across requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthContext {
    user_id: Option<Uuid>,
}

impl AuthContext {
    #[must_use]
    pub fn authenticated(user_id: Uuid) -> Self {
        Self { user_id: Some(user_id) }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }
}

/// Resolve the session's identity against the store.
///
/// A session naming an identity that no longer exists is treated as anonymous.
pub async fn authenticate(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let mut context = AuthContext::default();
    if let Some(id) = session.get::<Uuid>(AUTH_USER_KEY) {
        if state.users.exists(id).await? {
            context = AuthContext::authenticated(id);
        } else {
            tracing::debug!(user_id = %id, "session names a missing identity");
            session.remove(AUTH_USER_KEY);
        }
    }
    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

/// Redirect anonymous requests to the login page with a flash message.
pub async fn require_authentication(auth: AuthContext, session: Session, req: Request, next: Next) -> Response {
    if !auth.is_authenticated() {
        if req.method() == Method::GET {
            session.put(REDIRECT_AFTER_LOGIN_KEY, req.uri().path());
        }
        session.put(FLASH_KEY, LOGIN_REQUIRED_FLASH);
        return Redirect::to(LOGIN_PATH).into_response();
    }

    let mut response = next.run(req).await;
    // Pages behind the guard must not be stored by shared caches.
    response.headers_mut().insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    /// Missing context means the authenticate stage did not run: anonymous.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<AuthContext>().copied().unwrap_or_default())
    }
}
