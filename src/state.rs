//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is built once in `main` and injected into handlers and
//! middleware via the `State` extractor. Every field is a trait object or an
//! `Arc`-backed handle, so cloning per request is cheap and there is no
//! process-global mutable state.

use std::sync::Arc;

use crate::db::notes::NoteStore;
use crate::db::sessions::SessionStore;
use crate::db::users::UserStore;
use crate::services::credentials::Credentials;
use crate::services::password::PasswordHasher;
use crate::services::session::{SessionConfig, SessionManager};

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub notes: Arc<dyn NoteStore>,
    pub sessions: SessionManager,
    pub credentials: Credentials,
}

impl AppState {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        notes: Arc<dyn NoteStore>,
        session_store: Arc<dyn SessionStore>,
        session_config: SessionConfig,
        hasher: PasswordHasher,
    ) -> Self {
        let credentials = Credentials::new(users.clone(), hasher);
        Self { users, notes, sessions: SessionManager::new(session_store, session_config), credentials }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
