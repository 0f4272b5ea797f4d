use super::{AuthenticationError, SessionSerializable};
use crate::utils::{AppError, AppResult};
use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

pub const SESSION_COOKIE: &str = "session_id";
pub const DEFAULT_IDLE_TIMEOUT_MINUTES: i64 = 30;

lazy_static::lazy_static! {
    static ref SESSIONS: SessionStore = SessionStore::new();
}

/// Per-session state: the serialized principal plus the outcome of the last login attempt.
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    pub security_token: Option<String>,
    pub last_error: Option<AuthenticationError>,
    pub last_username: Option<String>,
}

#[derive(Debug)]
struct SessionEntry {
    data: SessionData,
    last_seen: DateTime<Utc>,
}

impl SessionEntry {
    fn new() -> Self {
        Self {
            data: SessionData::default(),
            last_seen: Utc::now(),
        }
    }
}

/// Sessions live in memory and are dropped after `idle_timeout` without access.
#[derive(Debug)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINUTES))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Process-wide store used by the server.
    pub fn global() -> &'static SessionStore {
        &SESSIONS
    }

    fn is_expired(&self, entry: &SessionEntry, now: DateTime<Utc>) -> bool {
        now - entry.last_seen > self.idle_timeout
    }

    /// Opens a fresh session. The only way entries are created.
    pub fn start(&self) -> String {
        self.purge_expired();
        let id = uuid::Uuid::new_v4().simple().to_string();
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(id.clone(), SessionEntry::new());
        }
        id
    }

    /// Replaces `old` with a brand new session id; whatever `old` held is discarded.
    pub fn renew(&self, old: Option<&str>) -> String {
        if let Some(old) = old {
            self.remove(old);
        }
        self.start()
    }

    pub fn remove(&self, id: &str) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(id);
        }
    }

    /// True for ids the store issued that have not expired yet.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Drops every idle session.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut sessions) = self.sessions.write() else {
            return 0;
        };
        let before = sessions.len();
        let now = Utc::now();
        sessions.retain(|_, entry| !self.is_expired(entry, now));
        let purged = before - sessions.len();
        if purged > 0 {
            log::debug!("🧹 Purged {} idle sessions, {} remaining", purged, sessions.len());
        }
        purged
    }

    pub fn get(&self, id: &str) -> Option<SessionData> {
        let mut data = None;
        self.update(id, |session| data = Some(session.clone()));
        data
    }

    /// Applies `f` to a live session and refreshes its last-seen time.
    /// Unknown or expired ids are left alone; returns whether `f` ran.
    pub fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut SessionData),
    {
        let Ok(mut sessions) = self.sessions.write() else {
            return false;
        };
        let now = Utc::now();
        let expired = match sessions.get(id) {
            Some(entry) => self.is_expired(entry, now),
            None => return false,
        };
        if expired {
            sessions.remove(id);
            return false;
        }
        match sessions.get_mut(id) {
            Some(entry) => {
                entry.last_seen = now;
                f(&mut entry.data);
                true
            }
            None => false,
        }
    }

    /// Stores the principal and forgets any earlier failed attempt.
    pub fn authenticate<U: SessionSerializable>(&self, id: &str, user: &U) -> AppResult<()> {
        let token = user.serialize_session()?;
        let stored = self.update(id, |data| {
            data.security_token = Some(token);
            data.last_error = None;
            data.last_username = None;
        });
        if !stored {
            return Err(AppError::Internal(format!("Session {} is not active", id)));
        }
        Ok(())
    }

    pub fn record_failure(&self, id: &str, error: AuthenticationError, username: &str) {
        self.update(id, |data| {
            data.security_token = None;
            data.last_error = Some(error);
            data.last_username = Some(username.to_string());
        });
    }

    /// Restores the principal held by the session, if any.
    pub fn principal<U: SessionSerializable>(&self, id: &str) -> AppResult<Option<U>> {
        match self.get(id).and_then(|data| data.security_token) {
            Some(token) => Ok(Some(U::deserialize_session(&token)?)),
            None => Ok(None),
        }
    }
}

pub fn session_id(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

pub fn session_cookie(id: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, id.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish()
}

/// Read side of the login flow: what went wrong last time and who tried.
pub struct AuthenticationUtils<'a> {
    store: &'a SessionStore,
    session_id: Option<String>,
}

impl<'a> AuthenticationUtils<'a> {
    pub fn new(store: &'a SessionStore, session_id: Option<String>) -> Self {
        Self { store, session_id }
    }

    pub fn from_request(store: &'a SessionStore, req: &HttpRequest) -> Self {
        Self::new(store, session_id(req))
    }

    /// With `clear`, the error is shown once only.
    pub fn last_authentication_error(&self, clear: bool) -> Option<AuthenticationError> {
        let id = self.session_id.as_deref()?;
        let error = self.store.get(id)?.last_error;
        if clear && error.is_some() {
            self.store.update(id, |data| data.last_error = None);
        }
        error
    }

    pub fn last_username(&self) -> String {
        self.session_id
            .as_deref()
            .and_then(|id| self.store.get(id))
            .and_then(|data| data.last_username)
            .unwrap_or_default()
    }
}
