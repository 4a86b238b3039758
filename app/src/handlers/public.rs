//! Public routes (no session required).

use actix_web::{get, post, web, HttpRequest, HttpResponse, HttpMessage, Responder};
use warden_core::http::error::AuthError;
use warden_core::http::security::{CsrfToken, FormLoginService, LoginForm, OptionalUser};

#[get("/login")]
pub async fn login_page(req: HttpRequest, form_login: web::Data<FormLoginService>) -> HttpResponse {
    if let Some(redirect) = form_login.redirect_if_authenticated(&req) {
        return redirect;
    }

    let message = match req.query_string() {
        q if has_flag(q, "error") => r#"<p class="error">Invalid username or password.</p>"#,
        q if has_flag(q, "logout") => r#"<p class="info">You have been signed out.</p>"#,
        _ => "",
    };

    let processing_url = form_login.config().get_login_processing_url();
    let action = match req.extensions().get::<CsrfToken>() {
        Some(token) => format!("{}?{}={}", processing_url, token.parameter_name(), token.value()),
        None => processing_url.to_string(),
    };

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(
            include_str!("../../web/login.html")
                .replace("{{message}}", message)
                .replace("{{action}}", &action),
        )
}

#[post("/login")]
pub async fn login(
    req: HttpRequest,
    form: web::Form<LoginForm>,
    form_login: web::Data<FormLoginService>,
) -> Result<HttpResponse, AuthError> {
    form_login.attempt_authentication(&req, &form).await
}

#[post("/logout")]
pub async fn logout(req: HttpRequest, form_login: web::Data<FormLoginService>) -> HttpResponse {
    form_login.logout(&req)
}

#[get("/")]
pub async fn index(user: OptionalUser) -> impl Responder {
    match user.into_inner() {
        Some(u) => HttpResponse::Ok().body(format!(
            "Welcome, {}! Continue to /secured/home.",
            u.get_username()
        )),
        None => HttpResponse::Ok().body("Welcome! Sign in at /login."),
    }
}

fn has_flag(query: &str, flag: &str) -> bool {
    query
        .split('&')
        .any(|pair| pair == flag || pair.split('=').next() == Some(flag))
}
