//! Form-based login and logout.
//!
//! # Spring Security Equivalent
//! `formLogin()` and `logout()` configuration
//!
//! # Example
//! ```rust,ignore
//! use warden_core::http::security::form_login::{FormLoginConfig, FormLoginService, LoginForm};
//!
//! let form_login = FormLoginService::new(
//!     credentials,
//!     sessions,
//!     FormLoginConfig::new().default_success_url("/secured"),
//! );
//!
//! async fn login(req: HttpRequest, form: web::Form<LoginForm>, svc: web::Data<FormLoginService>)
//!     -> Result<HttpResponse, AuthError>
//! {
//!     svc.attempt_authentication(&req, &form).await
//! }
//! ```

use actix_session::SessionExt;
use actix_web::http::header::LOCATION;
use actix_web::{HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::http::error::AuthError;
use crate::http::security::audit::{AuditLogger, SecurityEvent, SecurityEventType};
use crate::http::security::csrf::CsrfConfig;
use crate::http::security::session::SessionAuthenticator;
use crate::http::security::user_details::UserDetailsAuthenticator;

// =============================================================================
// Form Login Configuration
// =============================================================================

/// Form login configuration.
///
/// # Spring Security Equivalent
/// `FormLoginConfigurer` with `defaultSuccessUrl(url, true)`: a successful
/// login always lands on the default success URL.
#[derive(Debug, Clone)]
pub struct FormLoginConfig {
    login_page: String,
    login_processing_url: String,
    default_success_url: String,
    failure_url: String,
    logout_url: String,
    logout_success_url: String,
}

impl Default for FormLoginConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FormLoginConfig {
    pub fn new() -> Self {
        Self {
            login_page: "/login".to_string(),
            login_processing_url: "/login".to_string(),
            default_success_url: "/".to_string(),
            failure_url: "/login?error".to_string(),
            logout_url: "/logout".to_string(),
            logout_success_url: "/login?logout".to_string(),
        }
    }

    /// # Spring Equivalent
    /// `formLogin().loginPage("/login")`
    pub fn login_page(mut self, url: &str) -> Self {
        self.login_page = url.to_string();
        self
    }

    /// # Spring Equivalent
    /// `formLogin().loginProcessingUrl("/login")`
    pub fn login_processing_url(mut self, url: &str) -> Self {
        self.login_processing_url = url.to_string();
        self
    }

    pub fn default_success_url(mut self, url: &str) -> Self {
        self.default_success_url = url.to_string();
        self
    }

    pub fn failure_url(mut self, url: &str) -> Self {
        self.failure_url = url.to_string();
        self
    }

    pub fn logout_url(mut self, url: &str) -> Self {
        self.logout_url = url.to_string();
        self
    }

    pub fn logout_success_url(mut self, url: &str) -> Self {
        self.logout_success_url = url.to_string();
        self
    }

    pub fn get_login_page(&self) -> &str {
        &self.login_page
    }

    pub fn get_login_processing_url(&self) -> &str {
        &self.login_processing_url
    }

    pub fn get_default_success_url(&self) -> &str {
        &self.default_success_url
    }

    pub fn get_failure_url(&self) -> &str {
        &self.failure_url
    }

    pub fn get_logout_url(&self) -> &str {
        &self.logout_url
    }

    pub fn get_logout_success_url(&self) -> &str {
        &self.logout_success_url
    }

    /// Paths that stay reachable without a session.
    pub fn public_paths(&self) -> [&str; 3] {
        [
            path_only(&self.login_page),
            path_only(&self.login_processing_url),
            path_only(&self.logout_url),
        ]
    }
}

fn path_only(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

// =============================================================================
// Login Form Data
// =============================================================================

/// Submitted login form.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// =============================================================================
// Form Login Service
// =============================================================================

/// Processes login and logout against the credential store and the session registry.
#[derive(Clone)]
pub struct FormLoginService {
    credentials: UserDetailsAuthenticator,
    sessions: SessionAuthenticator,
    config: FormLoginConfig,
    audit: AuditLogger,
    csrf: Option<CsrfConfig>,
}

impl FormLoginService {
    pub fn new(
        credentials: UserDetailsAuthenticator,
        sessions: SessionAuthenticator,
        config: FormLoginConfig,
    ) -> Self {
        Self {
            credentials,
            sessions,
            config,
            audit: AuditLogger::new(),
            csrf: None,
        }
    }

    pub fn audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the session's CSRF token after every successful login.
    pub fn csrf(mut self, csrf: CsrfConfig) -> Self {
        self.csrf = Some(csrf);
        self
    }

    /// Verifies the form and, on success, binds a fresh session to the user.
    ///
    /// Bad credentials and disabled accounts give the same redirect to the
    /// failure URL. A store outage is returned as
    /// [`AuthError::DataStoreUnavailable`] and no session is created.
    pub async fn attempt_authentication(
        &self,
        req: &HttpRequest,
        form: &LoginForm,
    ) -> Result<HttpResponse, AuthError> {
        let ip = peer_ip(req);

        let user = match self
            .credentials
            .authenticate(&form.username, &form.password)
            .await
        {
            Ok(user) => user,
            Err(AuthError::DataStoreUnavailable) => {
                self.audit.log(
                    SecurityEvent::new(SecurityEventType::DataStoreUnavailable)
                        .username(&form.username)
                        .ip_address(&ip),
                );
                return Err(AuthError::DataStoreUnavailable);
            }
            Err(e) => {
                log::info!("Login failed for '{}' from {}", form.username, ip);
                self.audit.log(SecurityEvent::login_failure(
                    &form.username,
                    &ip,
                    &format!("{:?}", e),
                ));
                return Ok(self.on_authentication_failure());
            }
        };

        let session = req.get_session();
        if let Err(e) = self.sessions.login(&session, &user) {
            log::error!("Could not establish session for '{}': {}", user.get_username(), e);
            return Ok(self.on_authentication_failure());
        }
        if let Some(csrf) = &self.csrf {
            csrf.clear_token(&session);
        }

        log::info!("User '{}' logged in from {}", user.get_username(), ip);
        self.audit
            .log(SecurityEvent::login_success(user.get_username(), &ip));

        Ok(redirect(&self.config.default_success_url))
    }

    pub fn on_authentication_failure(&self) -> HttpResponse {
        redirect(&self.config.failure_url)
    }

    /// Destroys the session and redirects to the logout success URL.
    pub fn logout(&self, req: &HttpRequest) -> HttpResponse {
        if let Some(username) = self.sessions.logout(&req.get_session()) {
            log::info!("User '{}' logged out", username);
            self.audit.log(SecurityEvent::logout(&username));
        }
        redirect(&self.config.logout_success_url)
    }

    /// Redirect for a login page request that already carries a live session.
    pub fn redirect_if_authenticated(&self, req: &HttpRequest) -> Option<HttpResponse> {
        self.sessions
            .current_user(&req.get_session())
            .map(|_| redirect(&self.config.default_success_url))
    }

    pub fn config(&self) -> &FormLoginConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionAuthenticator {
        &self.sessions
    }
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location.to_string()))
        .finish()
}

fn peer_ip(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}
