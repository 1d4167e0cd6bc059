//! CSRF protection bound to the session.
//!
//! Every session carries a random secret under [`CSRF_TOKEN_KEY`]. Safe
//! methods pass straight through (and get a secret issued if the session has
//! none yet). Any other method must echo the secret in the `X-CSRF-Token`
//! header or the `csrf_token` form field.

use axum::body::Body;
use axum::extract::Request;
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::AppError;
use crate::services::session::{CSRF_TOKEN_KEY, Session, generate_token};

pub const CSRF_FORM_FIELD: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Upper bound on a form body buffered to look for the token.
const MAX_FORM_BYTES: usize = 2 * 1024 * 1024;

pub async fn verify_csrf(session: Session, req: Request, next: Next) -> Result<Response, AppError> {
    let expected = ensure_token(&session);
    if !requires_csrf(req.method()) {
        return Ok(next.run(req).await);
    }

    let (req, presented) = presented_token(req).await;
    match presented {
        Some(token) if constant_time_equal(&token, &expected) => Ok(next.run(req).await),
        _ => {
            tracing::warn!(method = %req.method(), uri = %req.uri(), "csrf token missing or mismatched");
            Err(AppError::Forbidden)
        }
    }
}

/// The session's CSRF secret, issuing one if absent.
pub fn ensure_token(session: &Session) -> String {
    if let Some(token) = session.get_string(CSRF_TOKEN_KEY) {
        return token;
    }
    let token = generate_token();
    session.put(CSRF_TOKEN_KEY, &token);
    token
}

pub(crate) fn requires_csrf(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"))
}

/// Extract the presented token, rebuilding the request if its body had to be read.
async fn presented_token(req: Request) -> (Request, Option<String>) {
    let from_header = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    if from_header.is_some() || !is_form(req.headers()) {
        return (req, from_header);
    }

    let (parts, body) = req.into_parts();
    let Ok(bytes) = axum::body::to_bytes(body, MAX_FORM_BYTES).await else {
        return (Request::from_parts(parts, Body::empty()), None);
    };
    let token = url::form_urlencoded::parse(&bytes)
        .find(|(key, _)| key == CSRF_FORM_FIELD)
        .map(|(_, value)| value.into_owned());
    (Request::from_parts(parts, Body::from(bytes)), token)
}

pub(crate) fn constant_time_equal(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    if a_bytes.len() != b_bytes.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a_bytes.iter().zip(b_bytes) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_methods_skip_csrf() {
        assert!(!requires_csrf(&Method::GET));
        assert!(!requires_csrf(&Method::HEAD));
        assert!(!requires_csrf(&Method::OPTIONS));
    }

    #[test]
    fn mutating_methods_require_csrf() {
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::TRACE] {
            assert!(requires_csrf(&method), "{method} should require a token");
        }
    }

    #[test]
    fn constant_time_equal_matches_only_identical() {
        assert!(constant_time_equal("abc123", "abc123"));
        assert!(!constant_time_equal("abc123", "abc124"));
        assert!(!constant_time_equal("abc", "abcd"));
        assert!(!constant_time_equal("", "a"));
    }

    #[test]
    fn form_content_type_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_form(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded; charset=utf-8".parse().unwrap(),
        );
        assert!(is_form(&headers));
    }

    #[tokio::test]
    async fn token_read_from_form_body_and_body_preserved() {
        let req = Request::builder()
            .method(Method::POST)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("title=hi&csrf_token=abc%3D"))
            .unwrap();
        let (req, token) = presented_token(req).await;
        assert_eq!(token.as_deref(), Some("abc="));
        let body = axum::body::to_bytes(req.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"title=hi&csrf_token=abc%3D");
    }

    #[tokio::test]
    async fn header_token_wins_without_reading_body() {
        let req = Request::builder()
            .method(Method::POST)
            .header(CSRF_HEADER, "from-header")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("csrf_token=from-body"))
            .unwrap();
        let (_, token) = presented_token(req).await;
        assert_eq!(token.as_deref(), Some("from-header"));
    }
}
