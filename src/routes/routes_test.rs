use std::path::PathBuf;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use regex::Regex;
use tower::ServiceExt;

use super::*;
use crate::forms::{MSG_BAD_CURRENT_PASSWORD, MSG_BAD_LOGIN, MSG_DUPLICATE_EMAIL};
use crate::middleware::auth::LOGIN_REQUIRED_FLASH;
use crate::routes::notes::NOTE_CREATED_FLASH;
use crate::routes::users::{LOGOUT_FLASH, PASSWORD_UPDATED_FLASH, SIGNUP_FLASH};
use crate::services::session::AUTH_USER_KEY;
use crate::state::test_helpers::{TestContext, seed_user, test_context};

// =============================================================================
// Test client
// =============================================================================

/// Browser stand-in that remembers the session cookie and the last CSRF token seen.
struct Client {
    app: Router,
    session: Option<String>,
    csrf: Option<String>,
}

struct Reply {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: String,
}

impl Reply {
    fn location(&self) -> &str {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default()
    }
}

impl Client {
    fn new(ctx: &TestContext) -> Self {
        let static_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("ui/static");
        Self { app: app(ctx.state.clone(), &static_dir), session: None, csrf: None }
    }

    async fn send(&mut self, mut builder: axum::http::request::Builder, body: Body) -> Reply {
        if let Some(token) = &self.session {
            builder = builder.header(header::COOKIE, format!("session={token}"));
        }
        let response: Response = self.app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();

        if let Some(set) = response.headers().get(header::SET_COOKIE) {
            let set = set.to_str().unwrap();
            let value = set.split(';').next().unwrap().trim_start_matches("session=");
            self.session = (!value.is_empty()).then(|| value.to_owned());
        }
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();

        let rx = Regex::new(r#"name="csrf_token" value="([^"]+)""#).unwrap();
        if let Some(caps) = rx.captures(&body) {
            self.csrf = Some(caps[1].to_owned());
        }
        Reply { status, headers, body }
    }

    async fn get(&mut self, uri: &str) -> Reply {
        self.send(Request::get(uri), Body::empty()).await
    }

    /// POST a form, attaching the remembered CSRF token.
    async fn post(&mut self, uri: &str, fields: &[(&str, &str)]) -> Reply {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in fields {
            form.append_pair(k, v);
        }
        if let Some(token) = &self.csrf {
            form.append_pair("csrf_token", token);
        }
        let builder = Request::post(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(builder, Body::from(form.finish())).await
    }

    async fn login(&mut self, email: &str, password: &str) -> Reply {
        self.get("/user/login").await;
        self.post("/user/login", &[("email", email), ("password", password)]).await
    }
}

fn assert_security_headers(reply: &Reply) {
    assert_eq!(
        reply.headers[header::CONTENT_SECURITY_POLICY],
        "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com"
    );
    assert_eq!(reply.headers[header::REFERRER_POLICY], "origin-when-cross-origin");
    assert_eq!(reply.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(reply.headers[header::X_FRAME_OPTIONS], "deny");
    assert_eq!(reply.headers[header::X_XSS_PROTECTION], "0");
}

// =============================================================================
// Standard chain only
// =============================================================================

#[tokio::test]
async fn health_check_ok_without_session() {
    let ctx = test_context();
    let mut client = Client::new(&ctx);
    let reply = client.get("/health_check").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body, "OK");
    assert!(reply.headers.get(header::SET_COOKIE).is_none());
    assert_security_headers(&reply);
    assert_eq!(ctx.sessions.len(), 0);
}

#[tokio::test]
async fn static_asset_served_with_security_headers() {
    let ctx = test_context();
    let mut client = Client::new(&ctx);
    let reply = client.get("/static/css/main.css").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert!(reply.body.contains("box-sizing"));
    assert!(reply.headers.get(header::SET_COOKIE).is_none());
    assert_security_headers(&reply);
}

#[tokio::test]
async fn unknown_path_is_404_with_security_headers() {
    let ctx = test_context();
    let mut client = Client::new(&ctx);
    let reply = client.get("/no/such/page").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_security_headers(&reply);
}

// =============================================================================
// Signup and login
// =============================================================================

#[tokio::test]
async fn signup_then_login_flow() {
    let ctx = test_context();
    let mut client = Client::new(&ctx);

    client.get("/user/signup").await;
    let reply = client
        .post("/user/signup", &[("name", "Alice"), ("email", "alice@example.com"), ("password", "pa55word!")])
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/user/login");

    let page = client.get("/user/login").await;
    assert!(page.body.contains(SIGNUP_FLASH));

    let reply = client.post("/user/login", &[("email", "alice@example.com"), ("password", "pa55word!")]).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/note/create");

    let page = client.get("/note/create").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.headers[header::CACHE_CONTROL], "no-store");
    assert!(page.body.contains(r#"action="/user/logout""#));
}

#[tokio::test]
async fn signup_with_used_email_rerenders_with_field_error() {
    let ctx = test_context();
    seed_user(&ctx, "Alice", "alice@example.com", "pa55word!").await;
    let mut client = Client::new(&ctx);

    client.get("/user/signup").await;
    let reply = client
        .post("/user/signup", &[("name", "Imposter"), ("email", "alice@example.com"), ("password", "different1")])
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.body.contains(MSG_DUPLICATE_EMAIL));
    assert!(reply.body.contains(r#"value="Imposter""#));
}

#[tokio::test]
async fn signup_invalid_form_is_422() {
    let ctx = test_context();
    let mut client = Client::new(&ctx);
    client.get("/user/signup").await;
    let reply = client.post("/user/signup", &[("name", ""), ("email", "bad"), ("password", "short")]).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.body.contains(crate::forms::MSG_EMAIL));
}

#[tokio::test]
async fn bad_logins_are_indistinguishable() {
    let ctx = test_context();
    let mut client = Client::new(&ctx);

    let unknown = client.login("alice@example.com", "pa55word!").await;
    seed_user(&ctx, "Alice", "alice@example.com", "correct-horse").await;
    let wrong_password = client.login("alice@example.com", "pa55word!").await;

    assert_eq!(unknown.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(unknown.status, wrong_password.status);
    assert_eq!(unknown.body, wrong_password.body);
    assert!(unknown.body.contains(MSG_BAD_LOGIN));
}

#[tokio::test]
async fn login_rotates_session_token() {
    let ctx = test_context();
    seed_user(&ctx, "Alice", "alice@example.com", "pa55word!").await;
    let mut client = Client::new(&ctx);

    client.get("/user/login").await;
    let before = client.session.clone().unwrap();
    assert!(ctx.sessions.data(&before).is_some());

    client.post("/user/login", &[("email", "alice@example.com"), ("password", "pa55word!")]).await;
    let after = client.session.clone().unwrap();

    assert_ne!(before, after);
    assert!(ctx.sessions.data(&before).is_none());
    assert!(ctx.sessions.data(&after).unwrap().contains_key(AUTH_USER_KEY));
}

// =============================================================================
// CSRF
// =============================================================================

#[tokio::test]
async fn login_post_without_csrf_token_is_forbidden() {
    let ctx = test_context();
    seed_user(&ctx, "Alice", "alice@example.com", "pa55word!").await;
    let mut client = Client::new(&ctx);

    let reply = client.post("/user/login", &[("email", "alice@example.com"), ("password", "pa55word!")]).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_security_headers(&reply);
}

#[tokio::test]
async fn csrf_token_from_another_session_is_forbidden() {
    let ctx = test_context();
    let mut victim = Client::new(&ctx);
    let mut attacker = Client::new(&ctx);
    attacker.get("/user/signup").await;
    victim.get("/user/signup").await;
    victim.csrf = attacker.csrf.clone();

    let reply = victim
        .post("/user/signup", &[("name", "Alice"), ("email", "alice@example.com"), ("password", "pa55word!")])
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Guard
// =============================================================================

#[tokio::test]
async fn guarded_page_redirects_then_returns_after_login() {
    let ctx = test_context();
    seed_user(&ctx, "Alice", "alice@example.com", "pa55word!").await;
    let mut client = Client::new(&ctx);

    let reply = client.get("/account/view").await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/user/login");

    let page = client.get("/user/login").await;
    assert!(page.body.contains(LOGIN_REQUIRED_FLASH));

    let reply = client.post("/user/login", &[("email", "alice@example.com"), ("password", "pa55word!")]).await;
    assert_eq!(reply.location(), "/account/view");

    let page = client.get("/account/view").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("alice@example.com"));
}

#[tokio::test]
async fn logout_clears_authentication() {
    let ctx = test_context();
    seed_user(&ctx, "Alice", "alice@example.com", "pa55word!").await;
    let mut client = Client::new(&ctx);
    client.login("alice@example.com", "pa55word!").await;
    let authenticated_token = client.session.clone().unwrap();

    client.get("/").await;
    let reply = client.post("/user/logout", &[]).await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/");
    assert!(ctx.sessions.data(&authenticated_token).is_none());

    let home = client.get("/").await;
    assert!(home.body.contains(LOGOUT_FLASH));
    assert!(home.body.contains(r#"href="/user/login""#));
    assert_eq!(client.get("/note/create").await.status, StatusCode::SEE_OTHER);
}

// =============================================================================
// Notes
// =============================================================================

#[tokio::test]
async fn create_and_view_note() {
    let ctx = test_context();
    seed_user(&ctx, "Alice", "alice@example.com", "pa55word!").await;
    let mut client = Client::new(&ctx);
    client.login("alice@example.com", "pa55word!").await;

    client.get("/note/create").await;
    let reply = client
        .post("/note/create", &[("title", "Shopping"), ("content", "eggs & milk"), ("expires", "7")])
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert!(reply.location().starts_with("/note/view/"));
    assert_eq!(ctx.notes.count(), 1);

    let location = reply.location().to_owned();
    let page = client.get(&location).await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains(NOTE_CREATED_FLASH));
    assert!(page.body.contains("eggs &amp; milk"));
}

#[tokio::test]
async fn invalid_note_rerenders_with_422() {
    let ctx = test_context();
    seed_user(&ctx, "Alice", "alice@example.com", "pa55word!").await;
    let mut client = Client::new(&ctx);
    client.login("alice@example.com", "pa55word!").await;

    client.get("/note/create").await;
    let reply = client.post("/note/create", &[("title", ""), ("content", "body"), ("expires", "30")]).await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(ctx.notes.count(), 0);
}

#[tokio::test]
async fn home_lists_seeded_notes() {
    let ctx = test_context();
    let id = ctx.notes.seed("An old silent pond", "A frog jumps into the pond");
    let mut client = Client::new(&ctx);
    let page = client.get("/").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains(&format!("/note/view/{id}")));
}

#[tokio::test]
async fn note_view_bad_or_missing_id_is_404() {
    let ctx = test_context();
    let mut client = Client::new(&ctx);
    assert_eq!(client.get("/note/view/not-a-uuid").await.status, StatusCode::NOT_FOUND);
    let missing = format!("/note/view/{}", uuid::Uuid::new_v4());
    assert_eq!(client.get(&missing).await.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Account
// =============================================================================

#[tokio::test]
async fn password_update_checks_current_password() {
    let ctx = test_context();
    seed_user(&ctx, "Alice", "alice@example.com", "pa55word!").await;
    let mut client = Client::new(&ctx);
    client.login("alice@example.com", "pa55word!").await;

    client.get("/account/password/update").await;
    let reply = client
        .post(
            "/account/password/update",
            &[("current_password", "wrong-guess"), ("new_password", "new-pa55word"), ("new_password_confirmation", "new-pa55word")],
        )
        .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(reply.body.contains(MSG_BAD_CURRENT_PASSWORD));

    let reply = client
        .post(
            "/account/password/update",
            &[("current_password", "pa55word!"), ("new_password", "new-pa55word"), ("new_password_confirmation", "new-pa55word")],
        )
        .await;
    assert_eq!(reply.status, StatusCode::SEE_OTHER);
    assert_eq!(reply.location(), "/account/view");
    assert!(client.get("/account/view").await.body.contains(PASSWORD_UPDATED_FLASH));

    assert!(ctx.state.credentials.login("alice@example.com", "new-pa55word").await.is_ok());
}
