//! Security headers middleware.
//!
//! # Spring Security Equivalent
//! `HttpSecurity.headers()` configuration
//!
//! Adds to every response:
//!
//! - `X-Content-Type-Options: nosniff`
//! - `X-Frame-Options` as configured (`DENY` unless relaxed)
//! - `Cache-Control` when set
//!
//! # Usage
//! ```ignore
//! use warden_core::http::security::headers::{FrameOptions, SecurityHeaders};
//!
//! App::new()
//!     .wrap(SecurityHeaders::default().frame_options(FrameOptions::SameOrigin))
//! ```

use std::rc::Rc;

use actix_service::{Service, Transform};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::Error;
use futures_util::future::{ok, LocalBoxFuture, Ready};
use serde::Deserialize;

/// Value of the `X-Frame-Options` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameOptions {
    /// Prevents the page from being framed entirely.
    #[default]
    Deny,
    /// Allows framing by the same origin only.
    SameOrigin,
    /// Sends no header.
    Disabled,
}

impl FrameOptions {
    fn to_header_value(self) -> Option<&'static str> {
        match self {
            FrameOptions::Deny => Some("DENY"),
            FrameOptions::SameOrigin => Some("SAMEORIGIN"),
            FrameOptions::Disabled => None,
        }
    }
}

/// Security headers configuration and middleware factory.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    content_type_options: bool,
    frame_options: FrameOptions,
    cache_control: Option<String>,
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        SecurityHeaders {
            content_type_options: true,
            frame_options: FrameOptions::Deny,
            cache_control: None,
        }
    }
}

impl SecurityHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// # Spring Security Equivalent
    /// `headers().frameOptions().deny()`, `.sameOrigin()` or `.disable()`
    pub fn frame_options(mut self, options: FrameOptions) -> Self {
        self.frame_options = options;
        self
    }

    pub fn cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    pub fn disable_content_type_options(mut self) -> Self {
        self.content_type_options = false;
        self
    }

    pub fn get_frame_options(&self) -> FrameOptions {
        self.frame_options
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = SecurityHeadersMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(SecurityHeadersMiddleware {
            service: Rc::new(service),
            config: self.clone(),
        })
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: Rc<S>,
    config: SecurityHeaders,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    actix_web::dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let config = self.config.clone();

        Box::pin(async move {
            let mut response = service.call(req).await?;
            let headers = response.headers_mut();

            if config.content_type_options {
                headers.insert(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                );
            }

            if let Some(value) = config.frame_options.to_header_value() {
                headers.insert(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static(value),
                );
            }

            if let Some(ref cache) = config.cache_control {
                if let Ok(value) = HeaderValue::from_str(cache) {
                    headers.insert(HeaderName::from_static("cache-control"), value);
                }
            }

            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test as actix_test, web, App, HttpResponse};

    #[test]
    fn test_frame_options_values() {
        assert_eq!(FrameOptions::Deny.to_header_value(), Some("DENY"));
        assert_eq!(FrameOptions::SameOrigin.to_header_value(), Some("SAMEORIGIN"));
        assert_eq!(FrameOptions::Disabled.to_header_value(), None);
    }

    #[test]
    fn test_frame_options_deserialize() {
        let parsed: Vec<FrameOptions> =
            serde_json::from_str(r#"["deny", "sameorigin", "disabled"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![FrameOptions::Deny, FrameOptions::SameOrigin, FrameOptions::Disabled]
        );
    }

    #[actix_web::test]
    async fn test_default_headers_deny_framing() {
        let app = actix_test::init_service(
            App::new()
                .wrap(SecurityHeaders::default())
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
        assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
    }

    #[actix_web::test]
    async fn test_disabled_frame_options_sends_no_header() {
        let app = actix_test::init_service(
            App::new()
                .wrap(SecurityHeaders::default().frame_options(FrameOptions::Disabled))
                .route("/", web::get().to(HttpResponse::Ok)),
        )
        .await;

        let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;

        assert!(resp.headers().get("x-frame-options").is_none());
    }
}
