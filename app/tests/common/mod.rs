//! Shared fixtures for the application tests.
//!
//! Every test gets its own in-memory database seeded with:
//! - bugs/bunny: USER
//! - daffy/duck: USER, MANAGER

#![allow(dead_code)]

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::header::LOCATION;
use actix_web::{test, Error};

use warden_app::security::Security;
use warden_app::settings::{
    CsrfSettings, DatabaseSettings, SecuritySettings, ServerSettings, Settings,
};
use warden_app::SESSION_COOKIE;
use warden_core::http::security::{AuditLogger, FrameOptions, InMemoryEventStore, SqlUserDetailsManager};

pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            bind_address: "127.0.0.1:0".to_string(),
        },
        database: DatabaseSettings {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        security: SecuritySettings {
            bcrypt_cost: 4,
            session_timeout_secs: 1800,
            seed_users: true,
            cookie_secure: false,
            frame_options: FrameOptions::Disabled,
            csrf: CsrfSettings { enabled: false },
        },
    }
}

pub struct TestContext {
    pub settings: Settings,
    pub security: Security,
    pub events: InMemoryEventStore,
}

pub async fn context() -> TestContext {
    context_with(test_settings()).await
}

pub async fn context_with(settings: Settings) -> TestContext {
    let store = SqlUserDetailsManager::connect(
        &settings.database.url,
        settings.database.max_connections,
    )
    .await
    .unwrap();
    let events = InMemoryEventStore::new();
    let audit = AuditLogger::new().add_handler(events.clone());
    let security = Security::init(&settings.security, store, audit).await.unwrap();

    TestContext {
        settings,
        security,
        events,
    }
}

/// Result of a form login: where it redirected and the session cookie, if any.
pub struct LoginOutcome {
    pub location: String,
    pub cookie: Option<Cookie<'static>>,
}

pub async fn login<S, B>(app: &S, username: &str, password: &str) -> LoginOutcome
where
    S: Service<Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", username), ("password", password)])
        .to_request();
    let resp = test::call_service(app, req).await;

    LoginOutcome {
        location: location(&resp),
        cookie: session_cookie(&resp),
    }
}

pub fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Option<Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
        .map(|c| c.into_owned())
}
