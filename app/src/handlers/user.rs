use actix_web::{get, HttpResponse, Responder};
use warden_core::http::security::AuthenticatedUser;

#[get("/user/profile")]
pub async fn profile(user: AuthenticatedUser) -> impl Responder {
    HttpResponse::Ok().body(format!(
        "Profile for: {}\nAuthorities: {:?}",
        user.get_username(),
        user.granted_authorities()
    ))
}
