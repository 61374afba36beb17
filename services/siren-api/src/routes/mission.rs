use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde_json::json;
use siren_core::IncidentId;
use siren_engine::MissionView;

use crate::auth::caller_unit;
use crate::routes::common::{engine_error, parse_uuid};
use crate::state::AppState;

#[get("/v1/mission")]
pub async fn current_mission(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let unit = match caller_unit(&req) {
        Ok(unit) => unit,
        Err(response) => return response,
    };

    match state.coordinator.current_mission(&unit).await {
        Ok(MissionView::Standby) => HttpResponse::Ok().json(json!({ "status": "standby" })),
        Ok(MissionView::Active(snapshot)) => HttpResponse::Ok().json(snapshot),
        Err(err) => engine_error(err),
    }
}

#[post("/v1/mission/{id}/acknowledge")]
pub async fn acknowledge_mission(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> HttpResponse {
    let unit = match caller_unit(&req) {
        Ok(unit) => unit,
        Err(response) => return response,
    };
    let uuid = match parse_uuid(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let incident_id = IncidentId::from_uuid(uuid);

    match state.coordinator.acknowledge(incident_id, &unit).await {
        Ok(status) => {
            HttpResponse::Ok().json(json!({ "incident_id": incident_id, "status": status }))
        }
        Err(err) => engine_error(err),
    }
}

#[post("/v1/mission/{id}/decline")]
pub async fn decline_mission(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> HttpResponse {
    let unit = match caller_unit(&req) {
        Ok(unit) => unit,
        Err(response) => return response,
    };
    let uuid = match parse_uuid(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let incident_id = IncidentId::from_uuid(uuid);

    match state.coordinator.decline(incident_id, &unit).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(err) => engine_error(err),
    }
}

#[post("/v1/mission/{id}/arrive")]
pub async fn arrive_mission(
    req: HttpRequest,
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> HttpResponse {
    let unit = match caller_unit(&req) {
        Ok(unit) => unit,
        Err(response) => return response,
    };
    let uuid = match parse_uuid(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let incident_id = IncidentId::from_uuid(uuid);

    match state.coordinator.arrive(incident_id, &unit).await {
        Ok(status) => {
            HttpResponse::Ok().json(json!({ "incident_id": incident_id, "status": status }))
        }
        Err(err) => engine_error(err),
    }
}
