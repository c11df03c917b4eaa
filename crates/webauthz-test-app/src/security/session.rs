use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub type SessionId = String;

/// Per-browser session content. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: Option<String>,
    pub not_after: Option<i64>,
}

impl Session {
    /// Authenticated while a username is set and `not_after` has not passed.
    pub fn is_authenticated(&self, now: DateTime<Utc>) -> bool {
        match (&self.username, self.not_after) {
            (Some(username), Some(not_after)) => {
                !username.is_empty() && now.timestamp_millis() <= not_after
            }
            _ => false,
        }
    }

    pub fn authenticated_user(&self, now: DateTime<Utc>) -> Option<&str> {
        if self.is_authenticated(now) {
            self.username.as_deref()
        } else {
            None
        }
    }

    pub fn login(&mut self, username: &str, now: DateTime<Utc>, ttl: Duration) {
        self.username = Some(username.to_string());
        self.not_after = Some((now + ttl).timestamp_millis());
    }

    pub fn logout(&mut self) {
        self.username = None;
        self.not_after = None;
    }
}

/// Generate a random 16-byte session identifier, hex encoded.
pub fn generate_session_id() -> SessionId {
    hex::encode(rand::random::<[u8; 16]>())
}

#[derive(Debug, Clone)]
struct StoredSession {
    session: Session,
    /// Sliding cookie expiry, epoch millis
    expires_at: i64,
}

/// In-memory session store keyed by session id.
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<DashMap<SessionId, StoredSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        info!("Initializing session store (ttl: {}s)", ttl.num_seconds());
        Self {
            storage: Arc::new(DashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Session for `id`, or `None` if unknown or its cookie has expired.
    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Option<Session> {
        let entry = self.storage.get(id)?;
        if entry.expires_at < now.timestamp_millis() {
            drop(entry);
            self.storage.remove(id);
            debug!("Session {} expired, removed from store", id);
            return None;
        }
        Some(entry.session.clone())
    }

    /// Existing session for the cookie value, or a fresh anonymous one.
    pub fn load_or_create(&self, id: Option<&str>, now: DateTime<Utc>) -> (SessionId, Session) {
        if let Some(id) = id {
            if let Some(session) = self.get(id, now) {
                return (id.to_string(), session);
            }
        }

        let id = generate_session_id();
        let session = Session::default();
        self.save(&id, session.clone(), now);
        debug!("Created session {}", id);
        (id, session)
    }

    /// Store the session and extend its expiry.
    pub fn save(&self, id: &str, session: Session, now: DateTime<Utc>) {
        let expires_at = (now + self.ttl).timestamp_millis();
        self.storage
            .insert(id.to_string(), StoredSession { session, expires_at });
    }

    /// Extend the expiry without touching the content.
    pub fn touch(&self, id: &str, now: DateTime<Utc>) {
        if let Some(mut entry) = self.storage.get_mut(id) {
            entry.expires_at = (now + self.ttl).timestamp_millis();
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Returns number of sessions removed
    pub fn cleanup_expired(&self, now: DateTime<Utc>) -> usize {
        let now_millis = now.timestamp_millis();
        let start_len = self.storage.len();
        self.storage.retain(|_, stored| stored.expires_at >= now_millis);
        let count = start_len.saturating_sub(self.storage.len());

        if count > 0 {
            info!("Cleaned up {} expired sessions", count);
        }

        count
    }
}

/// Request-scoped view of the current session, shared between the session
/// middleware and the handler through request extensions.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<HandleState>>,
}

struct HandleState {
    session: Session,
    dirty: bool,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HandleState {
                session,
                dirty: false,
            })),
        }
    }

    pub fn username(&self) -> Option<String> {
        self.inner.lock().session.username.clone()
    }

    pub fn authenticated_user(&self, now: DateTime<Utc>) -> Option<String> {
        self.inner
            .lock()
            .session
            .authenticated_user(now)
            .map(str::to_string)
    }

    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Session),
    {
        let mut state = self.inner.lock();
        f(&mut state.session);
        state.dirty = true;
    }

    /// Session content if a handler modified it.
    pub fn take_changes(&self) -> Option<Session> {
        let mut state = self.inner.lock();
        if !state.dirty {
            return None;
        }
        state.dirty = false;
        Some(state.session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttl() -> Duration {
        Duration::minutes(15)
    }

    #[test]
    fn test_empty_session_is_not_authenticated() {
        let now = Utc::now();
        assert!(!Session::default().is_authenticated(now));
        assert!(!Session {
            username: None,
            not_after: Some(now.timestamp_millis() + 1000),
        }
        .is_authenticated(now));
        assert!(!Session {
            username: Some("alice".to_string()),
            not_after: None,
        }
        .is_authenticated(now));
        assert!(!Session {
            username: Some(String::new()),
            not_after: Some(now.timestamp_millis() + 1000),
        }
        .is_authenticated(now));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let mut session = Session::default();
        session.login("alice", now, ttl());

        assert!(session.is_authenticated(now));
        assert!(session.is_authenticated(now + ttl()));
        assert!(!session.is_authenticated(now + ttl() + Duration::milliseconds(1)));
        assert_eq!(session.authenticated_user(now), Some("alice"));
    }

    #[test]
    fn test_logout_clears_fields() {
        let now = Utc::now();
        let mut session = Session::default();
        session.login("alice", now, ttl());
        session.logout();
        assert_eq!(session, Session::default());
    }

    #[test]
    fn test_session_id_format() {
        let id = generate_session_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_session_id());
    }

    #[test]
    fn test_load_or_create() {
        let store = SessionStore::new(ttl());
        let now = Utc::now();

        let (id, session) = store.load_or_create(None, now);
        assert_eq!(session, Session::default());
        assert_eq!(store.len(), 1);

        let (same_id, _) = store.load_or_create(Some(&id), now);
        assert_eq!(same_id, id);

        let (other_id, _) = store.load_or_create(Some("unknown"), now);
        assert_ne!(other_id, "unknown");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_expired_sessions_are_replaced_and_swept() {
        let store = SessionStore::new(ttl());
        let now = Utc::now();
        let (id, _) = store.load_or_create(None, now);
        let (_other, _) = store.load_or_create(None, now + Duration::minutes(10));

        let later = now + Duration::minutes(16);
        assert!(store.get(&id, later).is_none());

        let (fresh, _) = store.load_or_create(Some(&id), later);
        assert_ne!(fresh, id);

        assert_eq!(store.cleanup_expired(now + Duration::hours(1)), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn test_touch_extends_expiry() {
        let store = SessionStore::new(ttl());
        let now = Utc::now();
        let (id, _) = store.load_or_create(None, now);

        store.touch(&id, now + Duration::minutes(10));
        assert!(store.get(&id, now + Duration::minutes(20)).is_some());
    }

    #[test]
    fn test_handle_tracks_changes() {
        let handle = SessionHandle::new(Session::default());
        assert!(handle.take_changes().is_none());

        let now = Utc::now();
        handle.update(|session| session.login("alice", now, ttl()));
        assert_eq!(handle.authenticated_user(now).as_deref(), Some("alice"));

        let changed = handle.take_changes().expect("login should mark the session dirty");
        assert_eq!(changed.username.as_deref(), Some("alice"));
        assert!(handle.take_changes().is_none());
    }
}
