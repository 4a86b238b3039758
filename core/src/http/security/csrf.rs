//! CSRF (Cross-Site Request Forgery) protection.
//!
//! # Spring Security Equivalent
//! `CsrfFilter` with `HttpSessionCsrfTokenRepository`
//!
//! A token is generated per session and stored in it. State-changing
//! requests (POST, PUT, DELETE, PATCH) must echo it back in the
//! `X-CSRF-TOKEN` header or the `_csrf` query parameter. Handlers read the
//! current token from request extensions as a [`CsrfToken`].
//!
//! # Usage
//! ```ignore
//! use warden_core::http::security::csrf::{CsrfConfig, CsrfProtection};
//!
//! App::new()
//!     .wrap(CsrfProtection::new(CsrfConfig::new()))
//!     .wrap(SessionMiddleware::new(store, key))
//! ```

use std::rc::Rc;

use actix_service::{Service, Transform};
use actix_session::{Session, SessionExt};
use actix_web::body::EitherBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::Method;
use actix_web::{Error, HttpMessage, HttpResponse};
use derive_more::Display;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::http::security::ant_matcher::AntMatcher;
use crate::http::security::audit::{AuditLogger, SecurityEvent, SecurityEventType};
use crate::http::security::authorizer::request_path;

/// CSRF token available to handlers through request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    token: String,
    header_name: String,
    parameter_name: String,
}

impl CsrfToken {
    pub fn value(&self) -> &str {
        &self.token
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }
}

#[derive(Debug, Display, derive_more::Error, PartialEq, Eq)]
pub enum CsrfError {
    #[display("CSRF token missing")]
    MissingToken,
    #[display("CSRF token mismatch")]
    TokenMismatch,
    #[display("CSRF storage error: {reason}")]
    StorageError { reason: String },
}

// =============================================================================
// CSRF Configuration
// =============================================================================

#[derive(Clone)]
pub struct CsrfConfig {
    enabled: bool,
    session_key: String,
    header_name: String,
    parameter_name: String,
    protected_methods: Vec<Method>,
    ignored_paths: Vec<AntMatcher>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CsrfConfig {
    pub fn new() -> Self {
        Self {
            enabled: true,
            session_key: "CSRF_TOKEN".to_string(),
            header_name: "X-CSRF-TOKEN".to_string(),
            parameter_name: "_csrf".to_string(),
            protected_methods: vec![Method::POST, Method::PUT, Method::DELETE, Method::PATCH],
            ignored_paths: Vec::new(),
        }
    }

    /// # Spring Security Equivalent
    /// `csrf().disable()` when `false`
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Skips validation for paths matching the Ant pattern.
    pub fn ignore_path(mut self, pattern: &str) -> Self {
        self.ignored_paths.push(AntMatcher::new(pattern));
        self
    }

    pub fn header_name(mut self, name: &str) -> Self {
        self.header_name = name.to_string();
        self
    }

    pub fn parameter_name(mut self, name: &str) -> Self {
        self.parameter_name = name.to_string();
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Drops the session's token; the next request through the middleware
    /// issues a fresh one.
    ///
    /// # Spring Security Equivalent
    /// `CsrfAuthenticationStrategy`
    pub fn clear_token(&self, session: &Session) {
        session.remove(&self.session_key);
    }

    fn is_path_ignored(&self, path: &str) -> bool {
        self.ignored_paths.iter().any(|m| m.matches(path))
    }

    fn requires_protection(&self, method: &Method) -> bool {
        self.protected_methods.contains(method)
    }

    fn token(&self, value: String) -> CsrfToken {
        CsrfToken {
            token: value,
            header_name: self.header_name.clone(),
            parameter_name: self.parameter_name.clone(),
        }
    }

    /// Loads the session's token, creating one on first use.
    fn load_or_create(&self, req: &ServiceRequest) -> Result<CsrfToken, CsrfError> {
        let session = req.get_session();
        if let Some(existing) = session.get::<String>(&self.session_key).ok().flatten() {
            return Ok(self.token(existing));
        }

        let bytes: [u8; 32] = rand::thread_rng().gen();
        let value = hex::encode(bytes);
        session
            .insert(&self.session_key, &value)
            .map_err(|e| CsrfError::StorageError {
                reason: e.to_string(),
            })?;
        Ok(self.token(value))
    }

    fn validate(&self, req: &ServiceRequest, expected: &CsrfToken) -> Result<(), CsrfError> {
        match submitted_token(req, self) {
            Some(submitted) if bool::from(submitted.as_bytes().ct_eq(expected.token.as_bytes())) => {
                Ok(())
            }
            Some(_) => Err(CsrfError::TokenMismatch),
            None => Err(CsrfError::MissingToken),
        }
    }
}

fn submitted_token(req: &ServiceRequest, config: &CsrfConfig) -> Option<String> {
    if let Some(header_value) = req.headers().get(config.header_name.as_str()) {
        if let Ok(token) = header_value.to_str() {
            return Some(token.to_string());
        }
    }

    let param_prefix = format!("{}=", config.parameter_name);
    req.query_string()
        .split('&')
        .find_map(|pair| pair.strip_prefix(param_prefix.as_str()))
        .map(str::to_string)
}

// =============================================================================
// CSRF Protection Middleware
// =============================================================================

#[derive(Clone)]
pub struct CsrfProtection {
    config: CsrfConfig,
    audit: AuditLogger,
}

impl CsrfProtection {
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config,
            audit: AuditLogger::new(),
        }
    }

    pub fn audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for CsrfProtection
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = CsrfMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CsrfMiddleware {
            service: Rc::new(service),
            protection: self.clone(),
        })
    }
}

pub struct CsrfMiddleware<S> {
    service: Rc<S>,
    protection: CsrfProtection,
}

impl<S, B> Service<ServiceRequest> for CsrfMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let CsrfProtection { config, audit } = self.protection.clone();

        Box::pin(async move {
            if !config.enabled || config.is_path_ignored(request_path(&req)) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let token = match config.load_or_create(&req) {
                Ok(token) => token,
                Err(e) => {
                    log::error!("{}", e);
                    let response = HttpResponse::Forbidden().body(e.to_string());
                    return Ok(req.into_response(response.map_into_right_body()));
                }
            };
            req.extensions_mut().insert(token.clone());

            if config.requires_protection(req.method()) {
                if let Err(e) = config.validate(&req, &token) {
                    log::warn!("Rejected {} {}: {}", req.method(), request_path(&req), e);
                    audit.log(
                        SecurityEvent::new(SecurityEventType::CsrfValidationFailed)
                            .from_request(&req)
                            .detail("reason", e.to_string()),
                    );
                    let response = HttpResponse::Forbidden().body(e.to_string());
                    return Ok(req.into_response(response.map_into_right_body()));
                }
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}
