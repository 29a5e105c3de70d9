//! HTTP surface of the proxy.

mod health;
mod routes;

use crate::{
    config::Config,
    error::{Result, StyleError},
    proxy::Proxy,
};
use actix_web::{
    http::{header, StatusCode},
    middleware, web, App, HttpResponse, HttpServer, ResponseError,
};
use serde_json::json;

/// Base64 photos arrive inline, so the JSON limit is well above actix's default.
const JSON_LIMIT: usize = 20 * 1024 * 1024;

impl ResponseError for StyleError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(ResponseError::status_code(self))
            .json(json!({ "error": self.to_string() }))
    }
}

/// Registers every route plus the JSON extractor settings.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(|err, _req| StyleError::invalid(err.to_string()).into()),
    );
    health::configure(cfg);
    routes::configure(cfg);
}

pub fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add((header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .add((header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"))
        .add((header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"))
}

pub async fn run(config: Config) -> Result<()> {
    let proxy = web::Data::new(Proxy::from_config(&config)?);
    let bind = (config.host.clone(), config.port_or_default());

    log::info!("🌐 Listening on http://{}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(proxy.clone())
            .wrap(middleware::Logger::new("%r %s %Dms"))
            .wrap(cors_headers())
            .configure(configure)
    })
    .bind(bind)
    .map_err(|e| StyleError::ConfigError(format!("Cannot bind server: {}", e)))?
    .run()
    .await
    .map_err(|e| StyleError::RequestError(format!("Server stopped: {}", e)))
}
