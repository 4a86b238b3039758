//! Store outages, CSRF protection and response headers.

mod common;

use actix_web::http::StatusCode;
use actix_web::test;

use common::{context, context_with, location, login, session_cookie, test_settings};
use warden_app::create_app;
use warden_core::http::security::{FrameOptions, SecurityEventType};

// =============================================================================
// Credential Store Outage
// =============================================================================

#[actix_web::test]
async fn test_store_outage_fails_closed() {
    let ctx = context().await;
    let app = test::init_service(create_app(&ctx.settings, &ctx.security)).await;
    ctx.security.store.pool().close().await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "daffy"), ("password", "duck")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(session_cookie(&resp).is_none());
    assert!(ctx.security.sessions.registry().is_empty());
    assert_eq!(
        ctx.events
            .get_events_by_type(&SecurityEventType::DataStoreUnavailable)
            .len(),
        1
    );
}

// =============================================================================
// CSRF
// =============================================================================

fn csrf_settings() -> warden_app::settings::Settings {
    let mut settings = test_settings();
    settings.security.csrf.enabled = true;
    settings
}

#[actix_web::test]
async fn test_csrf_rejects_post_without_token() {
    let ctx = context_with(csrf_settings()).await;
    let app = test::init_service(create_app(&ctx.settings, &ctx.security)).await;

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "bugs"), ("password", "bunny")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(ctx.security.sessions.registry().is_empty());
    assert_eq!(
        ctx.events
            .get_events_by_type(&SecurityEventType::CsrfValidationFailed)
            .len(),
        1
    );
}

#[actix_web::test]
async fn test_csrf_login_with_form_token() {
    let ctx = context_with(csrf_settings()).await;
    let app = test::init_service(create_app(&ctx.settings, &ctx.security)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/login").to_request()).await;
    let cookie = session_cookie(&resp).unwrap();
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();

    let start = body.find("action=\"").unwrap() + "action=\"".len();
    let action = &body[start..start + body[start..].find('"').unwrap()];
    assert!(action.starts_with("/login?_csrf="));

    let req = test::TestRequest::post()
        .uri(action)
        .cookie(cookie)
        .set_form([("username", "bugs"), ("password", "bunny")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/secured");
}

#[actix_web::test]
async fn test_csrf_token_rotates_on_login() {
    let ctx = context_with(csrf_settings()).await;
    let app = test::init_service(create_app(&ctx.settings, &ctx.security)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/login").to_request()).await;
    let cookie = session_cookie(&resp).unwrap();
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    let start = body.find("action=\"").unwrap() + "action=\"".len();
    let action = body[start..start + body[start..].find('"').unwrap()].to_string();
    let old_token = action.trim_start_matches("/login?_csrf=").to_string();

    let req = test::TestRequest::post()
        .uri(&action)
        .cookie(cookie)
        .set_form([("username", "bugs"), ("password", "bunny")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/secured");
    let cookie = session_cookie(&resp).unwrap();

    // The pre-login token no longer authorises state changes
    let req = test::TestRequest::post()
        .uri(&format!("/logout?_csrf={}", old_token))
        .cookie(cookie)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.security.sessions.registry().len(), 1);
}

#[actix_web::test]
async fn test_csrf_disabled_accepts_plain_post() {
    let ctx = context().await;
    let app = test::init_service(create_app(&ctx.settings, &ctx.security)).await;

    assert_eq!(login(&app, "bugs", "bunny").await.location, "/secured");
}

// =============================================================================
// Security Headers
// =============================================================================

#[actix_web::test]
async fn test_frame_options_disabled_omits_header() {
    let ctx = context().await;
    let app = test::init_service(create_app(&ctx.settings, &ctx.security)).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/h2-console").to_request()).await;

    assert!(resp.headers().get("x-frame-options").is_none());
    assert_eq!(resp.headers().get("x-content-type-options").unwrap(), "nosniff");
}

#[actix_web::test]
async fn test_frame_options_follow_settings() {
    for (options, expected) in [(FrameOptions::Deny, "DENY"), (FrameOptions::SameOrigin, "SAMEORIGIN")] {
        let mut settings = test_settings();
        settings.security.frame_options = options;
        let ctx = context_with(settings).await;
        let app = test::init_service(create_app(&ctx.settings, &ctx.security)).await;

        // Security headers apply to redirects as well
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/secured").to_request()).await;

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), expected);
    }
}
