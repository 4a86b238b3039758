//! Secured area (USER or MANAGER).

use actix_web::{get, HttpResponse, Responder};
use warden_core::http::security::AuthenticatedUser;

#[get("/secured")]
pub async fn secured(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!("Secured area. Signed in as {}.", user.get_username()))
}

#[get("/secured/home")]
pub async fn secured_home(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!(
        "Home of {}\nRoles: {:?}",
        user.get_username(),
        user.get_roles()
    ))
}
