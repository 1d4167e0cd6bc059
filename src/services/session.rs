//! Session management: token issue, load-on-request, save-on-response.
//!
//! ARCHITECTURE
//! ============
//! A [`Session`] is the per-request handle placed in request extensions by the
//! load-and-save middleware. Handlers mutate it freely; nothing touches the
//! store until [`SessionManager::save`] runs after the handler finishes.
//!
//! Token rotation ([`Session::renew_token`]) and [`Session::destroy`] retire
//! the current token. Retired tokens are deleted from the store during save,
//! before the replacement is committed, so a fixed pre-login token can never
//! resolve to the authenticated session.
//!
//! When a handler panics its response is discarded, so a token issued during
//! that request could never reach the client. [`SessionManager::save_without_cookie`]
//! covers that path without leaving unreachable rows behind.
//!
//! TRADE-OFFS
//! ==========
//! Concurrent requests carrying the same token each load their own copy of
//! the data and commit it whole. The last save wins; writes from overlapping
//! requests can be lost. This is accepted for the small, rarely contended
//! bags stored here.

use std::fmt::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use rand::Rng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::db::StoreError;
use crate::db::sessions::SessionStore;

pub const SESSION_COOKIE_NAME: &str = "session";

/// Session key holding the authenticated identity's id.
pub const AUTH_USER_KEY: &str = "authenticatedUserID";
/// Session key holding the one-shot flash message.
pub const FLASH_KEY: &str = "flash";
/// Session key holding the CSRF secret bound to this session.
pub const CSRF_TOKEN_KEY: &str = "csrfToken";
/// Session key holding the path a guarded request was headed to.
pub const REDIRECT_AFTER_LOGIN_KEY: &str = "redirectPathAfterLogin";

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Unmodified,
    Modified,
    Destroyed,
}

#[derive(Debug)]
struct Inner {
    token: Option<String>,
    data: Map<String, Value>,
    expiry: OffsetDateTime,
    status: Status,
    retired: Vec<String>,
}

/// Per-request session handle. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<Inner>>,
}

impl Session {
    fn new(token: Option<String>, data: Map<String, Value>, expiry: OffsetDateTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { token, data, expiry, status: Status::Unmodified, retired: Vec::new() })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Current token, if the session has been persisted or renewed.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.lock().status
    }

    /// Typed read. Missing keys and values of the wrong shape both yield `None`.
    #[must_use]
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock().data.get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    pub fn put<T: Serialize>(&self, key: &str, value: T) {
        let Ok(value) = serde_json::to_value(value) else {
            tracing::warn!(key, "session value not serializable, dropped");
            return;
        };
        let mut inner = self.lock();
        inner.data.insert(key.to_owned(), value);
        inner.status = Status::Modified;
    }

    pub fn remove(&self, key: &str) {
        let mut inner = self.lock();
        if inner.data.remove(key).is_some() {
            inner.status = Status::Modified;
        }
    }

    /// Read and delete a string value in one step.
    pub fn pop_string(&self, key: &str) -> Option<String> {
        let mut inner = self.lock();
        let value = inner.data.remove(key)?;
        inner.status = Status::Modified;
        match value {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Issue a new token bound to the same data. Call on every privilege change,
    /// before writing the new privilege into the session.
    pub fn renew_token(&self) {
        let mut inner = self.lock();
        if let Some(old) = inner.token.take() {
            inner.retired.push(old);
        }
        inner.token = Some(generate_token());
        inner.status = Status::Modified;
    }

    /// Invalidate the token and drop all data. A later `put` starts a fresh
    /// session under a new token.
    pub fn destroy(&self) {
        let mut inner = self.lock();
        if let Some(old) = inner.token.take() {
            inner.retired.push(old);
        }
        inner.data.clear();
        inner.status = Status::Destroyed;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub lifetime: Duration,
    pub cookie_secure: bool,
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    fn fresh_expiry(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc() + self.config.lifetime
    }

    /// Load the session for `token`. Absent, unknown or expired tokens yield an
    /// empty session rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing store fails.
    pub async fn load(&self, token: Option<&str>) -> Result<Session, StoreError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Ok(Session::new(None, Map::new(), self.fresh_expiry()));
        };
        match self.store.find(token).await? {
            Some(record) => Ok(Session::new(Some(token.to_owned()), record.data, record.expiry)),
            None => Ok(Session::new(None, Map::new(), self.fresh_expiry())),
        }
    }

    /// Persist the session and return the cookie the response must carry, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn save(&self, session: &Session) -> Result<Option<Cookie<'static>>, StoreError> {
        let (retired, status, token, data, expiry) = {
            let mut inner = session.lock();
            if inner.status == Status::Modified {
                // A token issued during this request starts a full lifetime.
                let reissued = inner.token.is_none() || !inner.retired.is_empty();
                if inner.token.is_none() {
                    inner.token = Some(generate_token());
                }
                if reissued {
                    inner.expiry = self.fresh_expiry();
                }
            }
            (std::mem::take(&mut inner.retired), inner.status, inner.token.clone(), inner.data.clone(), inner.expiry)
        };

        for old in &retired {
            self.store.delete(old).await?;
        }

        match (status, token) {
            (Status::Modified, Some(token)) => {
                self.store.commit(&token, &data, expiry).await?;
                Ok(Some(self.cookie(token, Some(expiry))))
            }
            (Status::Destroyed, _) => Ok(Some(self.cookie(String::new(), None))),
            _ => Ok(None),
        }
    }

    /// Persist a session whose response was lost, so no cookie can reach the
    /// client. Retired tokens are still deleted, but data is only committed
    /// under a token the client already holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn save_without_cookie(&self, session: &Session) -> Result<(), StoreError> {
        let (retired, pending) = {
            let mut inner = session.lock();
            let retired = std::mem::take(&mut inner.retired);
            let pending = match (&inner.token, inner.status) {
                (Some(token), Status::Modified) if retired.is_empty() => {
                    Some((token.clone(), inner.data.clone(), inner.expiry))
                }
                _ => None,
            };
            (retired, pending)
        };

        for old in &retired {
            self.store.delete(old).await?;
        }
        if let Some((token, data, expiry)) = pending {
            self.store.commit(&token, &data, expiry).await?;
        }
        Ok(())
    }

    /// Build the session cookie. `None` expiry clears it.
    fn cookie(&self, value: String, expiry: Option<OffsetDateTime>) -> Cookie<'static> {
        let mut cookie = Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.config.cookie_secure)
            .build();
        match expiry {
            Some(at) => cookie.set_expires(at),
            None => cookie.make_removal(),
        }
        cookie
    }

    /// Drop expired rows from the backing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.store.delete_expired().await
    }
}

/// Spawn the background task that periodically purges expired sessions.
pub fn spawn_cleanup_task(manager: SessionManager, interval: Duration) -> tokio::task::JoinHandle<()> {
    tracing::info!(interval_secs = interval.as_secs(), "session cleanup configured");
    tokio::spawn(async move {
        // `interval` panics on a zero period.
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match manager.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "expired sessions purged"),
                Err(e) => tracing::warn!(error = %e, "session purge failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
