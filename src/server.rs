//! Thin actix-web host around the pipeline.
//!
//! `GET /api/live` runs one invocation per request with a fresh HTTP client
//! and the configured deadline. Every response allows any origin.

use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, Scope, middleware, web};
use serde::Serialize;
use tracing::info;

use crate::config::HeatConfig;
use crate::handler::HeatResponse;
use crate::pipeline::Pipeline;

#[derive(Serialize)]
struct ApiHealth {
    healthy: bool,
    version: String,
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/live`
pub async fn live(config: web::Data<HeatConfig>) -> HttpResponse {
    let deadline = Duration::from_secs(config.http.request_deadline_secs);
    let result = match Pipeline::with_default_client(&config) {
        Ok(pipeline) => pipeline.run_until(tokio::time::sleep(deadline)).await,
        Err(err) => Err(err),
    };

    let response = HeatResponse::from_result(result);
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status)
        .insert_header(("Cache-Control", "no-store"))
        .json(response.body)
}

pub fn routes() -> Scope {
    web::scope("/api")
        .route("/health", web::get().to(health))
        .route("/live", web::get().to(live))
}

pub fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new().add(("Access-Control-Allow-Origin", "*"))
}

pub async fn serve(config: HeatConfig, bind_addr: &str, port: u16) -> std::io::Result<()> {
    info!(bind_addr, port, source = ?config.source, "Starting server");
    let state = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(cors_headers())
            .app_data(state.clone())
            .service(routes())
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
