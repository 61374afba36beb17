use crate::domain::{Incident, IncidentStatus};
use crate::error::{DispatchError, DispatchResult};
use crate::ids::UnitCode;

/// Triggers that move an incident through its lifecycle. Side effects
/// (events, unit availability) belong to the coordinator; this module only
/// rewrites the status/assignment pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Dispatch found a unit.
    Assign(UnitCode),
    /// Dispatch found no candidate.
    Exhaust,
    /// The assigned unit acknowledged the mission.
    Acknowledge,
    /// The assigned unit declined; the incident re-enters `new`.
    Decline,
    /// The assigned unit reported arrival on scene.
    Arrive,
    /// An external process re-opens a `no_unit_available` incident.
    Reopen,
}

impl Transition {
    fn describe(&self) -> &'static str {
        match self {
            Self::Assign(_) => "assign",
            Self::Exhaust => "exhaust",
            Self::Acknowledge => "acknowledge",
            Self::Decline => "decline",
            Self::Arrive => "arrive",
            Self::Reopen => "reopen",
        }
    }
}

/// Applies one transition in place. Illegal moves leave the incident
/// untouched and surface `InvalidTransition`.
pub fn apply(incident: &mut Incident, transition: Transition) -> DispatchResult<()> {
    use IncidentStatus::*;

    match (incident.status, &transition) {
        (New, Transition::Assign(unit)) => {
            incident.status = AwaitingAcknowledgment;
            incident.assigned_unit = Some(unit.clone());
        }
        (New, Transition::Exhaust) => {
            incident.status = NoUnitAvailable;
            incident.assigned_unit = None;
        }
        (AwaitingAcknowledgment, Transition::Acknowledge) => {
            incident.status = InTransit;
        }
        (AwaitingAcknowledgment, Transition::Decline) => {
            incident.status = New;
            incident.assigned_unit = None;
        }
        (InTransit, Transition::Arrive) => {
            incident.status = Resolved;
        }
        (NoUnitAvailable, Transition::Reopen) => {
            incident.status = New;
        }
        (status, transition) => {
            return Err(DispatchError::invalid_transition(format!(
                "{} is not legal from {}",
                transition.describe(),
                status.as_str()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_geo::Coordinate;

    fn incident() -> Incident {
        Incident::report(Coordinate::new(10.5276, 76.2144), None)
    }

    #[test]
    fn assign_sets_unit_and_awaits_acknowledgment() {
        let mut subject = incident();
        apply(&mut subject, Transition::Assign(UnitCode::from("AMB-01"))).unwrap();
        assert_eq!(subject.status, IncidentStatus::AwaitingAcknowledgment);
        assert_eq!(subject.assigned_unit, Some(UnitCode::from("AMB-01")));
        assert!(subject.assignment_consistent());
    }

    #[test]
    fn exhaust_clears_assignment() {
        let mut subject = incident();
        apply(&mut subject, Transition::Exhaust).unwrap();
        assert_eq!(subject.status, IncidentStatus::NoUnitAvailable);
        assert_eq!(subject.assigned_unit, None);
        assert!(subject.assignment_consistent());
    }

    #[test]
    fn acknowledge_moves_to_in_transit_and_keeps_unit() {
        let mut subject = incident();
        apply(&mut subject, Transition::Assign(UnitCode::from("AMB-01"))).unwrap();
        apply(&mut subject, Transition::Acknowledge).unwrap();
        assert_eq!(subject.status, IncidentStatus::InTransit);
        assert_eq!(subject.assigned_unit, Some(UnitCode::from("AMB-01")));
    }

    #[test]
    fn decline_returns_to_new_without_assignment() {
        let mut subject = incident();
        apply(&mut subject, Transition::Assign(UnitCode::from("AMB-01"))).unwrap();
        apply(&mut subject, Transition::Decline).unwrap();
        assert_eq!(subject.status, IncidentStatus::New);
        assert_eq!(subject.assigned_unit, None);
    }

    #[test]
    fn arrive_resolves_and_keeps_responding_unit() {
        let mut subject = incident();
        apply(&mut subject, Transition::Assign(UnitCode::from("AMB-01"))).unwrap();
        apply(&mut subject, Transition::Acknowledge).unwrap();
        apply(&mut subject, Transition::Arrive).unwrap();
        assert_eq!(subject.status, IncidentStatus::Resolved);
        assert_eq!(subject.assigned_unit, Some(UnitCode::from("AMB-01")));
    }

    #[test]
    fn reopen_re_enters_at_new() {
        let mut subject = incident();
        apply(&mut subject, Transition::Exhaust).unwrap();
        apply(&mut subject, Transition::Reopen).unwrap();
        assert_eq!(subject.status, IncidentStatus::New);
        assert_eq!(subject.assigned_unit, None);
    }

    #[test]
    fn illegal_transition_is_rejected_and_state_unchanged() {
        let mut subject = incident();
        apply(&mut subject, Transition::Assign(UnitCode::from("AMB-01"))).unwrap();
        apply(&mut subject, Transition::Acknowledge).unwrap();
        apply(&mut subject, Transition::Arrive).unwrap();

        let before = subject.clone();
        let err = apply(&mut subject, Transition::Acknowledge).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidTransition);
        assert_eq!(subject.status, before.status);
        assert_eq!(subject.assigned_unit, before.assigned_unit);
    }

    #[test]
    fn terminal_states_reject_dispatch_triggers() {
        let mut resolved = incident();
        apply(&mut resolved, Transition::Assign(UnitCode::from("AMB-01"))).unwrap();
        apply(&mut resolved, Transition::Acknowledge).unwrap();
        apply(&mut resolved, Transition::Arrive).unwrap();
        assert!(apply(&mut resolved, Transition::Assign(UnitCode::from("AMB-02"))).is_err());
        assert!(apply(&mut resolved, Transition::Reopen).is_err());
    }
}
