//! Security audit events.
//!
//! # Spring Security Equivalent
//! `AuthenticationEventPublisher` and `AuthorizationEventPublisher`
//!
//! # Example
//!
//! ```
//! use warden_core::http::security::audit::{AuditLogger, InMemoryEventStore, SecurityEvent};
//!
//! let store = InMemoryEventStore::new();
//! let audit = AuditLogger::new().add_handler(store.clone());
//!
//! audit.log(SecurityEvent::login_success("daffy", "127.0.0.1"));
//! assert_eq!(store.get_events_by_user("daffy").len(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use actix_web::dev::ServiceRequest;

use crate::http::security::authorizer::request_path;

/// Security event types for audit logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEventType {
    AuthenticationSuccess,
    AuthenticationFailure,
    Logout,
    AccessDenied,
    CsrfValidationFailed,
    /// The credential store could not be reached.
    DataStoreUnavailable,
}

impl fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityEventType::AuthenticationSuccess => write!(f, "AUTHENTICATION_SUCCESS"),
            SecurityEventType::AuthenticationFailure => write!(f, "AUTHENTICATION_FAILURE"),
            SecurityEventType::Logout => write!(f, "LOGOUT"),
            SecurityEventType::AccessDenied => write!(f, "ACCESS_DENIED"),
            SecurityEventType::CsrfValidationFailed => write!(f, "CSRF_VALIDATION_FAILED"),
            SecurityEventType::DataStoreUnavailable => write!(f, "DATA_STORE_UNAVAILABLE"),
        }
    }
}

/// A security audit event.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SecurityEvent {
    pub id: String,
    /// Unix epoch milliseconds
    pub timestamp: u64,
    #[serde(serialize_with = "display_string")]
    pub event_type: SecurityEventType,
    pub username: Option<String>,
    pub path: Option<String>,
    pub ip_address: Option<String>,
    pub details: HashMap<String, String>,
}

fn display_string<S, T>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
    T: fmt::Display,
{
    serializer.collect_str(value)
}

impl SecurityEvent {
    pub fn new(event_type: SecurityEventType) -> Self {
        Self {
            id: generate_event_id(),
            timestamp: now_millis(),
            event_type,
            username: None,
            path: None,
            ip_address: None,
            details: HashMap::new(),
        }
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Fills path and peer address from the request.
    pub fn from_request(self, req: &ServiceRequest) -> Self {
        let event = self.path(request_path(req));
        match req.connection_info().realip_remote_addr() {
            Some(ip) => event.ip_address(ip),
            None => event,
        }
    }

    pub fn login_success(username: &str, ip: &str) -> Self {
        Self::new(SecurityEventType::AuthenticationSuccess)
            .username(username)
            .ip_address(ip)
    }

    pub fn login_failure(username: &str, ip: &str, reason: &str) -> Self {
        Self::new(SecurityEventType::AuthenticationFailure)
            .username(username)
            .ip_address(ip)
            .detail("reason", reason)
    }

    pub fn logout(username: &str) -> Self {
        Self::new(SecurityEventType::Logout).username(username)
    }

    pub fn access_denied(username: &str, path: &str) -> Self {
        Self::new(SecurityEventType::AccessDenied)
            .username(username)
            .path(path)
    }

    pub fn to_log_line(&self) -> String {
        let mut parts = vec![format!("[{}]", self.event_type)];

        if let Some(ref username) = self.username {
            parts.push(format!("user={}", username));
        }
        if let Some(ref ip) = self.ip_address {
            parts.push(format!("ip={}", ip));
        }
        if let Some(ref path) = self.path {
            parts.push(format!("path={}", path));
        }
        let mut details: Vec<_> = self.details.iter().collect();
        details.sort();
        for (k, v) in details {
            parts.push(format!("{}={}", k, v));
        }
        parts.push(format!("ts={}", self.timestamp));

        parts.join(" ")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.to_log_line())
    }
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn generate_event_id() -> String {
    use rand::Rng;
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", now_millis(), random)
}

/// Trait for handling security events.
pub trait SecurityEventHandler: Send + Sync {
    fn handle(&self, event: &SecurityEvent);
}

/// Writes events through the `log` facade under the `security.audit` target.
#[derive(Default)]
pub struct LogHandler;

impl SecurityEventHandler for LogHandler {
    fn handle(&self, event: &SecurityEvent) {
        match event.event_type {
            SecurityEventType::AuthenticationSuccess | SecurityEventType::Logout => {
                log::info!(target: "security.audit", "{}", event.to_log_line())
            }
            SecurityEventType::DataStoreUnavailable => {
                log::error!(target: "security.audit", "{}", event.to_log_line())
            }
            _ => log::warn!(target: "security.audit", "{}", event.to_log_line()),
        }
    }
}

/// In-memory event store for tests and debugging.
#[derive(Clone)]
pub struct InMemoryEventStore {
    events: Arc<Mutex<Vec<SecurityEvent>>>,
    max_events: usize,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            max_events: 10_000,
        }
    }

    pub fn max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    pub fn get_events(&self) -> Vec<SecurityEvent> {
        self.filtered(|_| true)
    }

    pub fn get_events_by_type(&self, event_type: &SecurityEventType) -> Vec<SecurityEvent> {
        self.filtered(|e| &e.event_type == event_type)
    }

    pub fn get_events_by_user(&self, username: &str) -> Vec<SecurityEvent> {
        self.filtered(|e| e.username.as_deref() == Some(username))
    }

    pub fn clear(&self) {
        if let Ok(mut events) = self.events.lock() {
            events.clear();
        }
    }

    fn filtered(&self, keep: impl Fn(&SecurityEvent) -> bool) -> Vec<SecurityEvent> {
        match self.events.lock() {
            Ok(events) => events.iter().filter(|e| keep(e)).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl SecurityEventHandler for InMemoryEventStore {
    fn handle(&self, event: &SecurityEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
            if events.len() > self.max_events {
                events.remove(0);
            }
        }
    }
}

/// Fans each event out to every registered handler.
#[derive(Clone)]
pub struct AuditLogger {
    handlers: Arc<Vec<Arc<dyn SecurityEventHandler>>>,
    enabled: bool,
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    /// Create a new audit logger with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
            enabled: true,
        }
    }

    /// Audit logger writing to the `log` facade.
    pub fn with_log() -> Self {
        Self::new().add_handler(LogHandler)
    }

    pub fn add_handler<H: SecurityEventHandler + 'static>(mut self, handler: H) -> Self {
        let handlers = Arc::make_mut(&mut self.handlers);
        handlers.push(Arc::new(handler));
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn log(&self, event: SecurityEvent) {
        if !self.enabled {
            return;
        }

        for handler in self.handlers.iter() {
            handler.handle(&event);
        }
    }
}
