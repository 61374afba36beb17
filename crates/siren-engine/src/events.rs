use serde::{Deserialize, Serialize};
use siren_core::{EpochMillis, IncidentId, IncidentStatus, UnitCode};
use siren_geo::Coordinate;

/// Closed set of events pushed over per-unit subscriptions. Consumers match
/// exhaustively; there is no string-keyed dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// Emitted once when a subscription is established.
    Connected { unit: UnitCode },
    /// A new incident was assigned to this unit.
    Assignment {
        incident_id: IncidentId,
        location: Coordinate,
        distance_km: f64,
        evidence: Option<String>,
        timestamp_ms: EpochMillis,
    },
    /// An incident changed status; broadcast to every subscription.
    StatusChanged {
        incident_id: IncidentId,
        status: IncidentStatus,
        unit: Option<UnitCode>,
    },
    /// A unit toggled duty state; broadcast to every subscription.
    AvailabilityUpdate { unit: UnitCode, available: bool },
}

impl DispatchEvent {
    /// Wire name, also used as the SSE `event:` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Assignment { .. } => "assignment",
            Self::StatusChanged { .. } => "status_changed",
            Self::AvailabilityUpdate { .. } => "availability_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_snake_case_tag() {
        let event = DispatchEvent::AvailabilityUpdate {
            unit: UnitCode::from("AMB-01"),
            available: false,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "availability_update");
        assert_eq!(value["unit"], "AMB-01");
        assert_eq!(value["available"], false);
        assert_eq!(event.kind(), "availability_update");
    }
}
