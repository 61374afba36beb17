pub mod common;
pub mod health;
pub mod incidents;
pub mod mission;
pub mod status;
pub mod stream;
pub mod units;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(status::status)
        .service(incidents::report_incident)
        .service(incidents::simulate_incident)
        .service(incidents::list_incidents)
        .service(incidents::get_incident)
        .service(incidents::redispatch_incident)
        .service(mission::current_mission)
        .service(mission::acknowledge_mission)
        .service(mission::decline_mission)
        .service(mission::arrive_mission)
        .service(units::list_units)
        .service(units::upsert_unit)
        .service(units::set_availability)
        .service(stream::sse);
}
