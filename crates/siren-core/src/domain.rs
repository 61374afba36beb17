use crate::ids::{IncidentId, UnitCode};
use crate::time::{now_epoch_millis, EpochMillis};
use serde::{Deserialize, Serialize};
use siren_geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    New,
    AwaitingAcknowledgment,
    NoUnitAvailable,
    InTransit,
    Resolved,
}

impl IncidentStatus {
    /// No further transition is defined from these states within the engine.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::NoUnitAvailable | Self::Resolved)
    }

    /// States in which `assigned_unit` must be set.
    pub fn requires_assignment(self) -> bool {
        matches!(self, Self::AwaitingAcknowledgment | Self::InTransit)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::AwaitingAcknowledgment => "awaiting_acknowledgment",
            Self::NoUnitAvailable => "no_unit_available",
            Self::InTransit => "in_transit",
            Self::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub created_at_ms: EpochMillis,
    pub location: Coordinate,
    pub status: IncidentStatus,
    #[serde(default)]
    pub assigned_unit: Option<UnitCode>,
    /// Opaque evidence locator supplied by the capture collaborator.
    #[serde(default)]
    pub evidence: Option<String>,
}

impl Incident {
    pub fn report(location: Coordinate, evidence: Option<String>) -> Self {
        Self {
            id: IncidentId::new(),
            created_at_ms: now_epoch_millis(),
            location,
            status: IncidentStatus::New,
            assigned_unit: None,
            evidence,
        }
    }

    /// Status/assignment pairing rule. Resolved incidents keep the unit that
    /// responded, as history.
    pub fn assignment_consistent(&self) -> bool {
        match self.status {
            IncidentStatus::New | IncidentStatus::NoUnitAvailable => self.assigned_unit.is_none(),
            IncidentStatus::AwaitingAcknowledgment | IncidentStatus::InTransit => {
                self.assigned_unit.is_some()
            }
            IncidentStatus::Resolved => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub code: UnitCode,
    pub location: Coordinate,
    /// Explicitly toggled flag, not derived from open incidents.
    pub available: bool,
    /// Whether an operator is currently responsible for this unit.
    pub staffed: bool,
}

impl Unit {
    pub fn is_dispatchable(&self) -> bool {
        self.available && self.staffed
    }
}
