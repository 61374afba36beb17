use actix_web::{get, post, web, HttpResponse};
use rand::Rng;
use serde::Deserialize;
use siren_core::IncidentId;
use siren_geo::Coordinate;

use crate::routes::common::{bad_request, engine_error, internal_error, not_found, parse_uuid};
use crate::state::AppState;

/// Simulated reports jitter around this point, as in the demo detector.
const SIM_BASE: Coordinate = Coordinate {
    latitude: 10.5276,
    longitude: 76.2144,
};

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub evidence: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[post("/v1/incidents")]
pub async fn report_incident(
    state: web::Data<AppState>,
    payload: web::Json<ReportRequest>,
) -> HttpResponse {
    let request = payload.into_inner();
    if !(-90.0..=90.0).contains(&request.latitude)
        || !(-180.0..=180.0).contains(&request.longitude)
    {
        return bad_request("coordinates out of range");
    }

    let location = Coordinate::new(request.latitude, request.longitude);
    match state
        .coordinator
        .report_incident(location, request.evidence)
        .await
    {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(err) => engine_error(err),
    }
}

#[post("/v1/incidents/simulate")]
pub async fn simulate_incident(state: web::Data<AppState>) -> HttpResponse {
    let (latitude, longitude) = {
        let mut rng = rand::thread_rng();
        (
            SIM_BASE.latitude + rng.gen_range(-0.05..=0.05),
            SIM_BASE.longitude + rng.gen_range(-0.05..=0.05),
        )
    };

    let location = Coordinate::new(latitude, longitude);
    match state.coordinator.report_incident(location, None).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(err) => engine_error(err),
    }
}

#[get("/v1/incidents")]
pub async fn list_incidents(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> HttpResponse {
    let limit = query.limit.unwrap_or(50);
    match state.incidents.list_recent(limit).await {
        Ok(incidents) => HttpResponse::Ok().json(incidents),
        Err(err) => internal_error(err.message),
    }
}

#[get("/v1/incidents/{id}")]
pub async fn get_incident(state: web::Data<AppState>, id: web::Path<String>) -> HttpResponse {
    let uuid = match parse_uuid(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let incident_id = IncidentId::from_uuid(uuid);

    match state.incidents.get(incident_id).await {
        Ok(Some(incident)) => HttpResponse::Ok().json(incident),
        Ok(None) => not_found("incident not found"),
        Err(err) => internal_error(err.message),
    }
}

/// Re-runs dispatch for a `no_unit_available` incident; the caller is the
/// external process that decides when to retry.
#[post("/v1/incidents/{id}/redispatch")]
pub async fn redispatch_incident(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> HttpResponse {
    let uuid = match parse_uuid(&id) {
        Ok(value) => value,
        Err(response) => return response,
    };
    let incident_id = IncidentId::from_uuid(uuid);

    match state.coordinator.redispatch(incident_id).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(err) => engine_error(err),
    }
}
