//! Session-based authentication.
//!
//! # Spring Security Equivalent
//! `HttpSessionSecurityContextRepository` with `SessionFixationProtectionStrategy.NEW_SESSION`
//!
//! The cookie managed by `actix-session` carries only an opaque session id.
//! The authenticated principal lives in a server-side [`SessionRegistry`], so
//! removing the record on logout invalidates the session even if the old
//! cookie is replayed.
//!
//! # Example
//! ```rust,ignore
//! use actix_session::{storage::CookieSessionStore, SessionMiddleware};
//! use warden_core::http::security::session::{SessionAuthenticator, SessionConfig};
//!
//! let sessions = SessionAuthenticator::new(SessionConfig::new());
//!
//! App::new()
//!     .wrap(SecurityTransform::new(sessions.clone(), authorizer))
//!     .wrap(SessionMiddleware::new(CookieSessionStore::default(), key))
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_session::{Session, SessionExt};
use actix_web::dev::ServiceRequest;
use dashmap::DashMap;
use derive_more::{Display, Error};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::http::security::config::Authenticator;
use crate::http::security::User;

const SESSION_ID_LENGTH: usize = 32;

// =============================================================================
// Session Configuration
// =============================================================================

/// Session authentication configuration.
///
/// # Spring Security Equivalent
/// `SessionManagementConfigurer`
#[derive(Debug, Clone)]
pub struct SessionConfig {
    session_key: String,
    timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Defaults: key `security_session_id`, 30 minute idle timeout.
    pub fn new() -> Self {
        Self {
            session_key: "security_session_id".to_string(),
            timeout: Duration::from_secs(30 * 60),
        }
    }

    /// Name of the cookie-session entry holding the session id.
    pub fn session_key(mut self, key: &str) -> Self {
        self.session_key = key.to_string();
        self
    }

    /// Idle time after which a session is no longer accepted.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn get_session_key(&self) -> &str {
        &self.session_key
    }

    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }
}

// =============================================================================
// Session Registry
// =============================================================================

/// Server-side state of one authenticated session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub username: String,
    pub roles: Vec<String>,
    pub authorities: Vec<String>,
    pub created_at: Instant,
    pub last_accessed: Instant,
}

impl SessionRecord {
    fn from_user(user: &User) -> Self {
        let now = Instant::now();
        Self {
            username: user.get_username().to_string(),
            roles: user.get_roles().to_vec(),
            authorities: user.get_authorities().to_vec(),
            created_at: now,
            last_accessed: now,
        }
    }

    pub fn to_user(&self) -> User {
        User::principal(&self.username)
            .roles(&self.roles)
            .authorities(&self.authorities)
    }

    fn is_expired(&self, timeout: Duration) -> bool {
        self.last_accessed.elapsed() >= timeout
    }
}

/// Concurrent map of session id to [`SessionRecord`].
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<String, SessionRecord>>,
    timeout: Duration,
}

impl SessionRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            timeout,
        }
    }

    /// Registers a session for `user` under a fresh random id.
    pub fn create(&self, user: &User) -> String {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SESSION_ID_LENGTH)
            .map(char::from)
            .collect();
        self.sessions.insert(id.clone(), SessionRecord::from_user(user));
        id
    }

    /// Resolves a live session and refreshes its idle timer.
    ///
    /// Expired records are removed on the way.
    pub fn lookup(&self, id: &str) -> Option<User> {
        let expired = match self.sessions.get_mut(id) {
            None => return None,
            Some(mut record) => {
                if !record.is_expired(self.timeout) {
                    record.last_accessed = Instant::now();
                    return Some(record.to_user());
                }
                true
            }
        };

        if expired {
            if let Some((_, record)) = self.sessions.remove(id) {
                log::debug!("Session of '{}' expired", record.username);
            }
        }
        None
    }

    pub fn invalidate(&self, id: &str) -> Option<SessionRecord> {
        self.sessions.remove(id).map(|(_, record)| record)
    }

    /// Drops every expired record and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, record| !record.is_expired(self.timeout));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// =============================================================================
// Session Authenticator
// =============================================================================

/// Resolves the principal of a request from its session cookie.
///
/// # Requirements
/// `SessionMiddleware` must wrap the security middleware so the session is
/// loaded before the authenticator runs.
#[derive(Clone)]
pub struct SessionAuthenticator {
    config: SessionConfig,
    registry: SessionRegistry,
}

impl SessionAuthenticator {
    pub fn new(config: SessionConfig) -> Self {
        let registry = SessionRegistry::new(config.get_timeout());
        Self { config, registry }
    }

    /// Binds `user` to a new session.
    ///
    /// Any record held by the current session is dropped and the cookie
    /// session is renewed, so the id presented before login never becomes
    /// authenticated.
    pub fn login(&self, session: &Session, user: &User) -> Result<(), SessionError> {
        if let Some(previous) = self.session_id(session) {
            self.registry.invalidate(&previous);
        }
        session.renew();

        let id = self.registry.create(user);
        session
            .insert(&self.config.session_key, &id)
            .map_err(|e| {
                self.registry.invalidate(&id);
                SessionError::InsertError {
                    reason: e.to_string(),
                }
            })
    }

    /// Destroys the session and returns the username it belonged to.
    pub fn logout(&self, session: &Session) -> Option<String> {
        let record = self
            .session_id(session)
            .and_then(|id| self.registry.invalidate(&id));
        session.purge();
        record.map(|r| r.username)
    }

    /// Principal bound to `session`, if any.
    pub fn current_user(&self, session: &Session) -> Option<User> {
        self.session_id(session)
            .and_then(|id| self.registry.lookup(&id))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    fn session_id(&self, session: &Session) -> Option<String> {
        session
            .get::<String>(&self.config.session_key)
            .ok()
            .flatten()
    }
}

impl Authenticator for SessionAuthenticator {
    fn get_user(&self, req: &ServiceRequest) -> Option<User> {
        self.current_user(&req.get_session())
    }
}

// =============================================================================
// Session Error
// =============================================================================

#[derive(Debug, Display, Error)]
pub enum SessionError {
    #[display("session insert error: {reason}")]
    InsertError { reason: String },
}
