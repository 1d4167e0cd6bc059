//! Note routes.

use axum::Form;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use uuid::Uuid;

use crate::error::AppError;
use crate::forms::{NoteForm, Validator};
use crate::middleware::auth::AuthContext;
use crate::services::session::{FLASH_KEY, Session};
use crate::state::AppState;
use crate::views::{self, TemplateData};

pub const NOTE_CREATED_FLASH: &str = "Note successfully created!";

/// `GET /note/view/{id}`. Unparseable ids are indistinguishable from missing ones.
pub async fn view(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
    Path(id): Path<String>,
) -> Result<Html<String>, AppError> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::NoSuchRecord)?;
    let note = state.notes.get(id).await?;
    Ok(views::note_view(&TemplateData::new(&session, auth), &note))
}

pub async fn create_form(session: Session, auth: AuthContext) -> Html<String> {
    views::note_create(&TemplateData::new(&session, auth), &NoteForm::default(), &Validator::default())
}

/// `POST /note/create`
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    auth: AuthContext,
    Form(form): Form<NoteForm>,
) -> Result<Response, AppError> {
    let v = form.validate();
    if !v.valid() {
        let page = views::note_create(&TemplateData::new(&session, auth), &form, &v);
        return Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response());
    }

    let id = state.notes.insert(&form.title, &form.content, form.expires).await?;
    tracing::info!(note_id = %id, "note created");
    session.put(FLASH_KEY, NOTE_CREATED_FLASH);
    Ok(Redirect::to(&format!("/note/view/{id}")).into_response())
}
