use async_trait::async_trait;
use siren_core::{Incident, IncidentId, IncidentStatus, Unit, UnitCode};
use std::fmt;

#[derive(Debug, Clone)]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StorageError {}

/// Read view plus availability writes over the responder roster.
#[async_trait]
pub trait UnitRepository: Send + Sync {
    async fn get(&self, code: &UnitCode) -> Result<Option<Unit>, StorageError>;
    async fn list(&self) -> Result<Vec<Unit>, StorageError>;
    /// Units that are both available and staffed, in directory order.
    async fn list_dispatchable(&self) -> Result<Vec<Unit>, StorageError>;
    async fn upsert(&self, unit: Unit) -> Result<(), StorageError>;
    /// Flips only the availability flag (mission accept/resolve).
    async fn set_availability(&self, code: &UnitCode, available: bool)
        -> Result<(), StorageError>;
    /// Flips staffing and availability together (duty toggle).
    async fn set_duty(&self, code: &UnitCode, on_duty: bool) -> Result<(), StorageError>;
}

#[async_trait]
pub trait IncidentRepository: Send + Sync {
    async fn create(&self, incident: Incident) -> Result<(), StorageError>;
    async fn get(&self, id: IncidentId) -> Result<Option<Incident>, StorageError>;
    /// Most recent first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Incident>, StorageError>;
    /// The latest non-terminal incident assigned to the unit, if any.
    async fn latest_active_for_unit(
        &self,
        code: &UnitCode,
    ) -> Result<Option<Incident>, StorageError>;
    /// Conditional write: persists `incident` only while the stored status
    /// still equals `expected`. Returns false when the guard fails, leaving
    /// prior state intact.
    async fn update_if_status(
        &self,
        expected: IncidentStatus,
        incident: Incident,
    ) -> Result<bool, StorageError>;
}
