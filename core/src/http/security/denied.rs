//! Access-denied handling.
//!
//! # Spring Security Equivalent
//! `AccessDeniedHandlerImpl`, wrapped by a handler that logs the denial first.

use actix_web::dev::ServiceRequest;
use actix_web::{http::header::ContentType, HttpResponse};

use crate::http::security::audit::{AuditLogger, SecurityEvent};
use crate::http::security::authorizer::request_path;
use crate::http::security::config::AccessDeniedHandler;
use crate::http::security::user::User;

/// Logs who tried to reach what, records an audit event and answers 403.
#[derive(Clone, Default)]
pub struct LoggingAccessDeniedHandler {
    audit: AuditLogger,
}

impl LoggingAccessDeniedHandler {
    pub fn new(audit: AuditLogger) -> Self {
        LoggingAccessDeniedHandler { audit }
    }
}

impl AccessDeniedHandler for LoggingAccessDeniedHandler {
    fn handle(&self, req: &ServiceRequest, user: &User) -> HttpResponse {
        let event = SecurityEvent::access_denied(user.get_username(), request_path(req))
            .from_request(req)
            .detail("roles", user.get_roles().join(","));

        log::warn!(
            "User '{}' attempted to access the protected URL: {} at {}",
            user.get_username(),
            request_path(req),
            event.timestamp
        );
        self.audit.log(event);

        HttpResponse::Forbidden()
            .content_type(ContentType::plaintext())
            .body("403 Forbidden: you do not have access to this resource")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::security::audit::{InMemoryEventStore, SecurityEventType};
    use actix_web::http::StatusCode;
    use actix_web::test::TestRequest;

    #[test]
    fn test_denial_is_audited_and_forbidden() {
        let store = InMemoryEventStore::new();
        let handler = LoggingAccessDeniedHandler::new(AuditLogger::new().add_handler(store.clone()));
        let req = TestRequest::with_uri("/manager/reports").to_srv_request();
        let bugs = User::principal("bugs").roles(&["USER".into()]);

        let resp = handler.handle(&req, &bugs);

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let events = store.get_events_by_type(&SecurityEventType::AccessDenied);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].username.as_deref(), Some("bugs"));
        assert_eq!(events[0].path.as_deref(), Some("/manager/reports"));
    }

    #[test]
    fn test_denial_records_decoded_path() {
        let store = InMemoryEventStore::new();
        let handler = LoggingAccessDeniedHandler::new(AuditLogger::new().add_handler(store.clone()));
        let req = TestRequest::with_uri("/%6danager/reports").to_srv_request();

        handler.handle(&req, &User::principal("bugs").roles(&["USER".into()]));

        let events = store.get_events_by_type(&SecurityEventType::AccessDenied);
        assert_eq!(events[0].path.as_deref(), Some("/manager/reports"));
    }
}
