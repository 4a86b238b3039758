//! Database console placeholder, left open like the rest of `/h2-console/**`.

use actix_web::{get, web, HttpResponse, Responder};

use crate::settings::DatabaseSettings;

#[get("/h2-console")]
pub async fn console(db: web::Data<DatabaseSettings>) -> impl Responder {
    page(&db, "")
}

#[get("/h2-console/{tail:.*}")]
pub async fn console_path(
    db: web::Data<DatabaseSettings>,
    tail: web::Path<String>,
) -> impl Responder {
    page(&db, &tail)
}

fn page(db: &DatabaseSettings, tail: &str) -> HttpResponse {
    HttpResponse::Ok().body(format!(
        "Database console\nURL: {}\nPool size: {}\nPath: /{}",
        db.url, db.max_connections, tail
    ))
}
