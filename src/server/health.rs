use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health));
}

async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Hairstyle simulation API",
        "status": "running",
    }))
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "healthy" }))
}
