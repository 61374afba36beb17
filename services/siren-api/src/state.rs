use siren_config::ServiceConfig;
use siren_engine::{DispatchCoordinator, EventFanout};
use siren_storage::{IncidentRepository, UnitRepository};
use std::sync::Arc;

pub struct AppState {
    pub config: ServiceConfig,
    pub coordinator: Arc<DispatchCoordinator>,
    pub fanout: Arc<EventFanout>,
    pub units: Arc<dyn UnitRepository>,
    pub incidents: Arc<dyn IncidentRepository>,
}
