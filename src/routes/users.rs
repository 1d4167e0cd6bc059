//! Signup, login, logout and account routes.
//!
//! Privilege changes rotate the session token before anything privileged is
//! written into the session. Logout destroys the session outright and starts
//! a fresh one only to carry the flash message.

use axum::Form;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use uuid::Uuid;

use crate::db::StoreError;
use crate::error::AppError;
use crate::forms::{
    LoginForm, MSG_BAD_CURRENT_PASSWORD, MSG_BAD_LOGIN, MSG_DUPLICATE_EMAIL, PasswordUpdateForm, SignupForm, Validator,
};
use crate::middleware::auth::{AuthContext, LOGIN_PATH};
use crate::services::session::{AUTH_USER_KEY, FLASH_KEY, REDIRECT_AFTER_LOGIN_KEY, Session};
use crate::state::AppState;
use crate::views::{self, TemplateData};

pub const SIGNUP_FLASH: &str = "Your signup was successful. Please log in.";
pub const LOGOUT_FLASH: &str = "You've been logged out successfully!";
pub const PASSWORD_UPDATED_FLASH: &str = "Your password has been updated!";

const DEFAULT_AFTER_LOGIN: &str = "/note/create";

fn unprocessable(page: Html<String>) -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
}

/// Only same-site absolute paths are followed after login.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.contains('\\')
}

// =============================================================================
// Signup
// =============================================================================

pub async fn signup_form(session: Session, auth: AuthContext) -> Html<String> {
    views::signup(&TemplateData::new(&session, auth), &SignupForm::default(), &Validator::default())
}

/// `POST /user/signup`
pub async fn signup(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let mut v = form.validate();
    if v.valid() {
        match state.credentials.signup(&form.name, &form.email, &form.password).await {
            Ok(_) => {
                session.put(FLASH_KEY, SIGNUP_FLASH);
                return Ok(Redirect::to(LOGIN_PATH).into_response());
            }
            Err(AppError::DuplicateIdentity) => v.add_field_error("email", MSG_DUPLICATE_EMAIL),
            Err(e) => return Err(e),
        }
    }
    Ok(unprocessable(views::signup(&TemplateData::new(&session, auth), &form, &v)))
}

// =============================================================================
// Login / logout
// =============================================================================

pub async fn login_form(session: Session, auth: AuthContext) -> Html<String> {
    views::login(&TemplateData::new(&session, auth), &LoginForm::default(), &Validator::default())
}

/// `POST /user/login`
///
/// Unknown email and wrong password render the same non-field error.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let mut v = form.validate();
    if v.valid() {
        match state.credentials.login(&form.email, &form.password).await {
            Ok(id) => {
                session.renew_token();
                session.put(AUTH_USER_KEY, id);
                let target = session
                    .pop_string(REDIRECT_AFTER_LOGIN_KEY)
                    .filter(|p| is_local_path(p))
                    .unwrap_or_else(|| DEFAULT_AFTER_LOGIN.to_owned());
                tracing::info!(user_id = %id, "login succeeded");
                return Ok(Redirect::to(&target).into_response());
            }
            Err(AppError::InvalidCredentials) => v.add_non_field_error(MSG_BAD_LOGIN),
            Err(e) => return Err(e),
        }
    }
    Ok(unprocessable(views::login(&TemplateData::new(&session, auth), &form, &v)))
}

/// `POST /user/logout`
pub async fn logout(session: Session) -> Redirect {
    session.destroy();
    session.put(FLASH_KEY, LOGOUT_FLASH);
    Redirect::to("/")
}

// =============================================================================
// Account
// =============================================================================

fn current_user(auth: AuthContext) -> Result<Uuid, Response> {
    auth.user_id().ok_or_else(|| Redirect::to(LOGIN_PATH).into_response())
}

/// `GET /account/view`
pub async fn account(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
) -> Result<Response, AppError> {
    let id = match current_user(auth) {
        Ok(id) => id,
        Err(redirect) => return Ok(redirect),
    };
    match state.users.get(id).await {
        Ok(user) => Ok(views::account(&TemplateData::new(&session, auth), &user).into_response()),
        Err(StoreError::NotFound) => Ok(Redirect::to(LOGIN_PATH).into_response()),
        Err(e) => Err(e.into()),
    }
}

pub async fn password_form(session: Session, auth: AuthContext) -> Html<String> {
    views::password_update(&TemplateData::new(&session, auth), &Validator::default())
}

/// `POST /account/password/update`
pub async fn password_update(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
    Form(form): Form<PasswordUpdateForm>,
) -> Result<Response, AppError> {
    let id = match current_user(auth) {
        Ok(id) => id,
        Err(redirect) => return Ok(redirect),
    };
    let mut v = form.validate();
    if v.valid() {
        match state.credentials.change_password(id, &form.current_password, &form.new_password).await {
            Ok(()) => {
                session.put(FLASH_KEY, PASSWORD_UPDATED_FLASH);
                return Ok(Redirect::to("/account/view").into_response());
            }
            Err(AppError::InvalidCredentials) => v.add_field_error("current_password", MSG_BAD_CURRENT_PASSWORD),
            Err(e) => return Err(e),
        }
    }
    Ok(unprocessable(views::password_update(&TemplateData::new(&session, auth), &v)))
}
