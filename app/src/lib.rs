//! Demo web application guarded by `warden-core`.
//!
//! Middleware, outermost first: access log, security headers, cookie
//! session, CSRF, access policy.

use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::Logger;
use actix_web::{web, App, Error};
use warden_core::http::security::{CsrfProtection, SecurityTransform};

pub mod handlers;
pub mod security;
pub mod settings;

use security::Security;
use settings::Settings;

pub const SESSION_COOKIE: &str = "WARDEN_SESSION";

pub fn create_app(
    settings: &Settings,
    security: &Security,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(security.form_login.clone()))
        .app_data(web::Data::new(settings.database.clone()))
        .configure(handlers::configure)
        .wrap(SecurityTransform::new(
            security.sessions.clone(),
            security.authorizer.clone(),
        ))
        .wrap(CsrfProtection::new(security.csrf.clone()).audit(security.audit.clone()))
        .wrap(
            SessionMiddleware::builder(CookieSessionStore::default(), security.cookie_key.clone())
                .cookie_name(SESSION_COOKIE.to_string())
                .cookie_secure(security.cookie_secure)
                .build(),
        )
        .wrap(security.headers.clone())
        .wrap(Logger::default())
}
