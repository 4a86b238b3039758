//! Route handlers grouped by the access rule that guards them.

use actix_web::web;

pub mod console;
pub mod home;
pub mod manager;
pub mod public;
pub mod user;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(public::login_page)
        .service(public::login)
        .service(public::logout)
        .service(public::index)
        .service(home::secured)
        .service(home::secured_home)
        .service(user::profile)
        .service(manager::reports)
        .service(console::console)
        .service(console::console_path);
}
