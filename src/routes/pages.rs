//! Landing and about pages.

use axum::extract::State;
use axum::response::Html;

use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::services::session::Session;
use crate::state::AppState;
use crate::views::{self, TemplateData};

/// `GET /`: the ten most recent unexpired notes.
pub async fn home(State(state): State<AppState>, session: Session, auth: AuthContext) -> Result<Html<String>, AppError> {
    let notes = state.notes.latest().await?;
    Ok(views::home(&TemplateData::new(&session, auth), &notes))
}

pub async fn about(session: Session, auth: AuthContext) -> Html<String> {
    views::about(&TemplateData::new(&session, auth))
}
