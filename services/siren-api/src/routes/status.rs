use actix_web::{get, web, HttpResponse};
use serde::Serialize;
use siren_core::now_epoch_millis;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct StatusResponse {
    service: String,
    environment: String,
    timestamp_ms: u64,
    connected_subscribers: usize,
}

#[get("/v1/status")]
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    let response = StatusResponse {
        service: state.config.service_name.clone(),
        environment: state.config.environment.to_string(),
        timestamp_ms: now_epoch_millis(),
        connected_subscribers: state.fanout.connected_subscribers(),
    };

    HttpResponse::Ok().json(response)
}
