mod auth;
mod routes;
mod state;

use actix_web::{web, App, HttpServer};
use siren_config::{ServiceConfig, StorageBackend};
use siren_engine::{DispatchCoordinator, EventFanout};
use siren_observability::{init, log_startup, ObservabilityConfig};
use siren_storage::{IncidentRepository, UnitRepository};
use siren_storage_memory::MemoryStore;
use siren_storage_postgres::{PostgresConfig, PostgresStore};
use state::AppState;
use std::io;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = ServiceConfig::from_env("siren-api");
    let obs_config = ObservabilityConfig {
        service_name: config.service_name.clone(),
        environment: config.environment.to_string(),
        log_level: config.log_level.clone(),
        metrics_addr: config.metrics_addr.clone(),
    };
    let handle = init(&obs_config);
    log_startup(&handle, &obs_config.environment);

    let (units, incidents): (Arc<dyn UnitRepository>, Arc<dyn IncidentRepository>) =
        match config.storage {
            StorageBackend::Memory => {
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            }
            StorageBackend::Postgres => {
                let store = PostgresStore::connect(&PostgresConfig::from_env())
                    .await
                    .map_err(|err| io::Error::other(err.message))?;
                let store = Arc::new(store);
                (store.clone(), store)
            }
        };

    let fanout = Arc::new(EventFanout::new(config.event_buffer));
    let coordinator = Arc::new(DispatchCoordinator::new(
        units.clone(),
        incidents.clone(),
        fanout.clone(),
    ));

    let bind_addr = config.bind_addr.clone();
    let shared_state = web::Data::new(AppState {
        config,
        coordinator,
        fanout,
        units,
        incidents,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(shared_state.clone())
            .configure(routes::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
