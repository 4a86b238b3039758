//! Manager-only routes.

use actix_web::{get, HttpResponse, Responder};
use warden_core::http::security::AuthenticatedUser;

#[get("/manager/reports")]
pub async fn reports(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!("Manager reports for {}", user.get_username()))
}
