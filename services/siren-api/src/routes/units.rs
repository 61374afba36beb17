use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use siren_core::Unit;

use crate::auth::caller_unit;
use crate::routes::common::{bad_request, engine_error, internal_error};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub on_duty: bool,
}

#[get("/v1/units")]
pub async fn list_units(state: web::Data<AppState>) -> HttpResponse {
    match state.units.list().await {
        Ok(units) => HttpResponse::Ok().json(units),
        Err(err) => internal_error(err.message),
    }
}

/// Roster provisioning for an external seeder; seed content is not ours.
#[post("/v1/units")]
pub async fn upsert_unit(state: web::Data<AppState>, payload: web::Json<Unit>) -> HttpResponse {
    let unit = payload.into_inner();
    if unit.code.is_empty() {
        return bad_request("unit code is required");
    }

    match state.units.upsert(unit.clone()).await {
        Ok(()) => HttpResponse::Ok().json(unit),
        Err(err) => internal_error(err.message),
    }
}

/// Flips staffing and availability together for the caller's unit.
#[post("/v1/units/availability")]
pub async fn set_availability(
    req: HttpRequest,
    state: web::Data<AppState>,
    payload: web::Json<AvailabilityRequest>,
) -> HttpResponse {
    let unit = match caller_unit(&req) {
        Ok(unit) => unit,
        Err(response) => return response,
    };
    let on_duty = payload.into_inner().on_duty;

    match state.coordinator.set_duty(&unit, on_duty).await {
        Ok(()) => HttpResponse::Ok().json(json!({ "unit": unit, "on_duty": on_duty })),
        Err(err) => engine_error(err),
    }
}
