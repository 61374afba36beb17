use crate::events::DispatchEvent;
use crate::fanout::EventFanout;
use crate::selector::select_nearest;
use serde::Serialize;
use siren_core::{
    lifecycle, DispatchError, DispatchResult, EpochMillis, Incident, IncidentId, IncidentStatus,
    Transition, UnitCode,
};
use siren_geo::{haversine_km, Coordinate};
use siren_storage::{IncidentRepository, StorageError, UnitRepository};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

/// Result of a dispatch pass over one incident.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub incident_id: IncidentId,
    pub status: IncidentStatus,
    pub assigned_unit: Option<UnitCode>,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissionSnapshot {
    pub incident_id: IncidentId,
    pub status: IncidentStatus,
    pub location: Coordinate,
    pub created_at_ms: EpochMillis,
    pub evidence: Option<String>,
    pub distance_km: f64,
}

/// Pull-based counterpart to the push stream; lets a client recover from a
/// dropped event.
#[derive(Debug, Clone)]
pub enum MissionView {
    Standby,
    Active(MissionSnapshot),
}

/// The only component that calls the selector and the transition function
/// together. One transition is in flight per incident at a time, guarded by
/// a per-incident async mutex; the conditional repository update backs that
/// guard at the storage layer.
pub struct DispatchCoordinator {
    units: Arc<dyn UnitRepository>,
    incidents: Arc<dyn IncidentRepository>,
    fanout: Arc<EventFanout>,
    guards: Mutex<HashMap<IncidentId, Arc<AsyncMutex<()>>>>,
}

impl DispatchCoordinator {
    pub fn new(
        units: Arc<dyn UnitRepository>,
        incidents: Arc<dyn IncidentRepository>,
        fanout: Arc<EventFanout>,
    ) -> Self {
        Self {
            units,
            incidents,
            fanout,
            guards: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an incident in `new`, runs one dispatch pass, and applies the
    /// resulting transition.
    pub async fn report_incident(
        &self,
        location: Coordinate,
        evidence: Option<String>,
    ) -> DispatchResult<DispatchOutcome> {
        let incident = Incident::report(location, evidence);
        self.incidents
            .create(incident.clone())
            .await
            .map_err(storage_unavailable)?;
        tracing::info!(incident = %incident.id, "incident reported");

        let guard = self.guard_for(incident.id);
        let _in_flight = guard.lock().await;
        self.run_dispatch(incident, None).await
    }

    /// Acknowledgment by the assigned unit; the unit goes unavailable and
    /// everyone hears `status_changed`.
    pub async fn acknowledge(
        &self,
        incident_id: IncidentId,
        unit: &UnitCode,
    ) -> DispatchResult<IncidentStatus> {
        let guard = self.guard_for(incident_id);
        let _in_flight = guard.lock().await;

        let mut incident = self.load(incident_id).await?;
        authorize(&incident, unit)?;

        let expected = incident.status;
        lifecycle::apply(&mut incident, Transition::Acknowledge)?;
        self.commit(expected, &incident).await?;
        self.units
            .set_availability(unit, false)
            .await
            .map_err(storage_unavailable)?;

        tracing::info!(incident = %incident_id, unit = %unit, "mission acknowledged");
        self.fanout.broadcast(&DispatchEvent::StatusChanged {
            incident_id,
            status: incident.status,
            unit: Some(unit.clone()),
        });
        Ok(incident.status)
    }

    /// Decline by the assigned unit: the incident re-enters `new` and is
    /// immediately re-dispatched with the declining unit excluded. Both
    /// steps happen under the same in-flight guard, so no concurrent caller
    /// can observe the unassigned gap.
    pub async fn decline(
        &self,
        incident_id: IncidentId,
        unit: &UnitCode,
    ) -> DispatchResult<DispatchOutcome> {
        let guard = self.guard_for(incident_id);
        let _in_flight = guard.lock().await;

        let mut incident = self.load(incident_id).await?;
        authorize(&incident, unit)?;

        let expected = incident.status;
        lifecycle::apply(&mut incident, Transition::Decline)?;
        self.commit(expected, &incident).await?;

        tracing::info!(incident = %incident_id, unit = %unit, "mission declined, re-dispatching");
        self.run_dispatch(incident, Some(unit)).await
    }

    /// Arrival on scene resolves the incident and frees the unit.
    pub async fn arrive(
        &self,
        incident_id: IncidentId,
        unit: &UnitCode,
    ) -> DispatchResult<IncidentStatus> {
        let guard = self.guard_for(incident_id);
        let _in_flight = guard.lock().await;

        let mut incident = self.load(incident_id).await?;
        authorize(&incident, unit)?;

        let expected = incident.status;
        lifecycle::apply(&mut incident, Transition::Arrive)?;
        self.commit(expected, &incident).await?;
        self.units
            .set_availability(unit, true)
            .await
            .map_err(storage_unavailable)?;

        tracing::info!(incident = %incident_id, unit = %unit, "incident resolved");
        metrics::counter!("siren_incidents_resolved_total").increment(1);
        self.fanout.broadcast(&DispatchEvent::StatusChanged {
            incident_id,
            status: incident.status,
            unit: Some(unit.clone()),
        });
        self.drop_guard(incident_id);
        Ok(incident.status)
    }

    /// Re-opens a `no_unit_available` incident and runs dispatch again.
    pub async fn redispatch(&self, incident_id: IncidentId) -> DispatchResult<DispatchOutcome> {
        let guard = self.guard_for(incident_id);
        let _in_flight = guard.lock().await;

        let mut incident = self.load(incident_id).await?;
        let expected = incident.status;
        lifecycle::apply(&mut incident, Transition::Reopen)?;
        self.commit(expected, &incident).await?;

        tracing::info!(incident = %incident_id, "incident re-opened");
        self.run_dispatch(incident, None).await
    }

    /// Snapshot read of the unit's most recent non-terminal assignment.
    pub async fn current_mission(&self, unit: &UnitCode) -> DispatchResult<MissionView> {
        let Some(incident) = self
            .incidents
            .latest_active_for_unit(unit)
            .await
            .map_err(storage_unavailable)?
        else {
            return Ok(MissionView::Standby);
        };

        let unit_row = self
            .units
            .get(unit)
            .await
            .map_err(storage_unavailable)?
            .ok_or_else(|| DispatchError::not_found(format!("unknown unit {unit}")))?;

        Ok(MissionView::Active(MissionSnapshot {
            incident_id: incident.id,
            status: incident.status,
            location: incident.location,
            created_at_ms: incident.created_at_ms,
            evidence: incident.evidence.clone(),
            distance_km: round_km(haversine_km(incident.location, unit_row.location)),
        }))
    }

    /// Flips staffing and availability together and tells everyone.
    pub async fn set_duty(&self, unit: &UnitCode, on_duty: bool) -> DispatchResult<()> {
        self.units
            .get(unit)
            .await
            .map_err(storage_unavailable)?
            .ok_or_else(|| DispatchError::not_found(format!("unknown unit {unit}")))?;
        self.units
            .set_duty(unit, on_duty)
            .await
            .map_err(storage_unavailable)?;

        tracing::info!(unit = %unit, on_duty, "unit duty state changed");
        self.fanout.broadcast(&DispatchEvent::AvailabilityUpdate {
            unit: unit.clone(),
            available: on_duty,
        });
        Ok(())
    }

    /// One selection + transition pass. Caller must hold the incident's
    /// in-flight guard.
    async fn run_dispatch(
        &self,
        mut incident: Incident,
        exclude: Option<&UnitCode>,
    ) -> DispatchResult<DispatchOutcome> {
        let candidates = self
            .units
            .list_dispatchable()
            .await
            .map_err(storage_unavailable)?;

        match select_nearest(incident.location, &candidates, exclude) {
            Some(selection) => {
                let expected = incident.status;
                lifecycle::apply(
                    &mut incident,
                    Transition::Assign(selection.unit.code.clone()),
                )?;
                self.commit(expected, &incident).await?;

                let distance_km = round_km(selection.distance_km);
                tracing::info!(
                    incident = %incident.id,
                    unit = %selection.unit.code,
                    distance_km,
                    "unit assigned"
                );
                metrics::counter!("siren_dispatch_assigned_total").increment(1);
                self.fanout.publish(
                    &selection.unit.code,
                    &DispatchEvent::Assignment {
                        incident_id: incident.id,
                        location: incident.location,
                        distance_km,
                        evidence: incident.evidence.clone(),
                        timestamp_ms: incident.created_at_ms,
                    },
                );

                Ok(DispatchOutcome {
                    incident_id: incident.id,
                    status: incident.status,
                    assigned_unit: incident.assigned_unit.clone(),
                    distance_km: Some(distance_km),
                })
            }
            None => {
                let expected = incident.status;
                lifecycle::apply(&mut incident, Transition::Exhaust)?;
                self.commit(expected, &incident).await?;

                tracing::warn!(incident = %incident.id, "no unit available");
                metrics::counter!("siren_dispatch_exhausted_total").increment(1);
                self.drop_guard(incident.id);

                Ok(DispatchOutcome {
                    incident_id: incident.id,
                    status: incident.status,
                    assigned_unit: None,
                    distance_km: None,
                })
            }
        }
    }

    /// Conditional persistence of one transition. A failed guard means a
    /// concurrent transition won the race; prior state is left intact.
    async fn commit(&self, expected: IncidentStatus, incident: &Incident) -> DispatchResult<()> {
        let applied = self
            .incidents
            .update_if_status(expected, incident.clone())
            .await
            .map_err(storage_unavailable)?;
        if !applied {
            return Err(DispatchError::conflict(format!(
                "incident {} was transitioned concurrently",
                incident.id
            )));
        }
        Ok(())
    }

    async fn load(&self, id: IncidentId) -> DispatchResult<Incident> {
        self.incidents
            .get(id)
            .await
            .map_err(storage_unavailable)?
            .ok_or_else(|| DispatchError::not_found(format!("unknown incident {id}")))
    }

    fn guard_for(&self, id: IncidentId) -> Arc<AsyncMutex<()>> {
        let mut guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
        guards.entry(id).or_default().clone()
    }

    fn drop_guard(&self, id: IncidentId) {
        let mut guards = self.guards.lock().unwrap_or_else(PoisonError::into_inner);
        guards.remove(&id);
    }
}

fn authorize(incident: &Incident, unit: &UnitCode) -> DispatchResult<()> {
    match &incident.assigned_unit {
        Some(assigned) if assigned == unit => Ok(()),
        _ => Err(DispatchError::unauthorized(format!(
            "incident {} is not assigned to unit {unit}",
            incident.id
        ))),
    }
}

fn storage_unavailable(err: StorageError) -> DispatchError {
    DispatchError::unavailable(err.message)
}

fn round_km(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::Unit;
    use siren_storage_memory::MemoryStore;

    const THRISSUR: Coordinate = Coordinate {
        latitude: 10.5276,
        longitude: 76.2144,
    };

    struct Fixture {
        store: Arc<MemoryStore>,
        fanout: Arc<EventFanout>,
        coordinator: Arc<DispatchCoordinator>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let fanout = Arc::new(EventFanout::new(8));
        let coordinator = Arc::new(DispatchCoordinator::new(
            store.clone(),
            store.clone(),
            fanout.clone(),
        ));
        Fixture {
            store,
            fanout,
            coordinator,
        }
    }

    async fn seed_unit(fixture: &Fixture, code: &str, latitude: f64, longitude: f64) {
        fixture
            .store
            .upsert(Unit {
                code: UnitCode::from(code),
                location: Coordinate::new(latitude, longitude),
                available: true,
                staffed: true,
            })
            .await
            .unwrap();
    }

    // ── Dispatch outcomes ───────────────────────────────────────────────

    #[tokio::test]
    async fn report_assigns_the_nearest_unit() {
        let fx = fixture();
        seed_unit(&fx, "AMB-NEAR", 10.5276, 76.2144).await;
        seed_unit(&fx, "AMB-FAR", 9.9312, 76.2673).await;

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();

        assert_eq!(outcome.status, IncidentStatus::AwaitingAcknowledgment);
        assert_eq!(outcome.assigned_unit, Some(UnitCode::from("AMB-NEAR")));
        assert!(outcome.distance_km.unwrap() < 0.01);
    }

    #[tokio::test]
    async fn report_with_no_candidates_is_no_unit_available() {
        let fx = fixture();

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();

        assert_eq!(outcome.status, IncidentStatus::NoUnitAvailable);
        assert_eq!(outcome.assigned_unit, None);
        let stored = IncidentRepository::get(&*fx.store, outcome.incident_id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.assignment_consistent());
    }

    #[tokio::test]
    async fn assignment_event_reaches_the_chosen_unit() {
        let fx = fixture();
        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;
        let mut subscription = fx.fanout.subscribe(UnitCode::from("AMB-01"));

        let outcome = fx
            .coordinator
            .report_incident(THRISSUR, Some("evidence/7.jpg".to_string()))
            .await
            .unwrap();

        match subscription.receiver.try_recv().unwrap() {
            DispatchEvent::Assignment {
                incident_id,
                distance_km,
                evidence,
                ..
            } => {
                assert_eq!(incident_id, outcome.incident_id);
                assert!(distance_km < 0.01);
                assert_eq!(evidence.as_deref(), Some("evidence/7.jpg"));
            }
            other => panic!("expected assignment, got {other:?}"),
        }
    }

    // ── Lifecycle side effects ──────────────────────────────────────────

    #[tokio::test]
    async fn acknowledge_marks_unit_unavailable_and_broadcasts() {
        let fx = fixture();
        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;
        let mut observer = fx.fanout.subscribe(UnitCode::from("AMB-99"));

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        let status = fx
            .coordinator
            .acknowledge(outcome.incident_id, &UnitCode::from("AMB-01"))
            .await
            .unwrap();

        assert_eq!(status, IncidentStatus::InTransit);
        let unit = UnitRepository::get(&*fx.store, &UnitCode::from("AMB-01"))
            .await
            .unwrap()
            .unwrap();
        assert!(!unit.available);
        match observer.receiver.try_recv().unwrap() {
            DispatchEvent::StatusChanged { status, .. } => {
                assert_eq!(status, IncidentStatus::InTransit);
            }
            other => panic!("expected status_changed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn arrive_resolves_and_frees_the_unit() {
        let fx = fixture();
        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;
        let code = UnitCode::from("AMB-01");

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        fx.coordinator
            .acknowledge(outcome.incident_id, &code)
            .await
            .unwrap();
        let status = fx
            .coordinator
            .arrive(outcome.incident_id, &code)
            .await
            .unwrap();

        assert_eq!(status, IncidentStatus::Resolved);
        let unit = UnitRepository::get(&*fx.store, &code).await.unwrap().unwrap();
        assert!(unit.available);
    }

    #[tokio::test]
    async fn decline_reassigns_excluding_the_decliner() {
        let fx = fixture();
        seed_unit(&fx, "AMB-NEAR", 10.5276, 76.2144).await;
        seed_unit(&fx, "AMB-FAR", 9.9312, 76.2673).await;

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        assert_eq!(outcome.assigned_unit, Some(UnitCode::from("AMB-NEAR")));

        let reassigned = fx
            .coordinator
            .decline(outcome.incident_id, &UnitCode::from("AMB-NEAR"))
            .await
            .unwrap();

        assert_eq!(reassigned.assigned_unit, Some(UnitCode::from("AMB-FAR")));
        assert_eq!(reassigned.status, IncidentStatus::AwaitingAcknowledgment);
    }

    #[tokio::test]
    async fn decline_with_no_alternative_exhausts() {
        let fx = fixture();
        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        let reassigned = fx
            .coordinator
            .decline(outcome.incident_id, &UnitCode::from("AMB-01"))
            .await
            .unwrap();

        assert_eq!(reassigned.status, IncidentStatus::NoUnitAvailable);
        assert_eq!(reassigned.assigned_unit, None);
    }

    #[tokio::test]
    async fn redispatch_reopens_an_exhausted_incident() {
        let fx = fixture();

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        assert_eq!(outcome.status, IncidentStatus::NoUnitAvailable);

        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;
        let retried = fx.coordinator.redispatch(outcome.incident_id).await.unwrap();

        assert_eq!(retried.status, IncidentStatus::AwaitingAcknowledgment);
        assert_eq!(retried.assigned_unit, Some(UnitCode::from("AMB-01")));
    }

    // ── Authorization and errors ────────────────────────────────────────

    #[tokio::test]
    async fn wrong_unit_is_unauthorized() {
        let fx = fixture();
        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        let err = fx
            .coordinator
            .acknowledge(outcome.incident_id, &UnitCode::from("AMB-02"))
            .await
            .unwrap_err();

        assert_eq!(err.code, siren_core::ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn acknowledging_a_resolved_incident_is_invalid() {
        let fx = fixture();
        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;
        let code = UnitCode::from("AMB-01");

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        fx.coordinator
            .acknowledge(outcome.incident_id, &code)
            .await
            .unwrap();
        fx.coordinator.arrive(outcome.incident_id, &code).await.unwrap();

        let err = fx
            .coordinator
            .acknowledge(outcome.incident_id, &code)
            .await
            .unwrap_err();
        assert_eq!(err.code, siren_core::ErrorCode::InvalidTransition);
    }

    #[tokio::test]
    async fn unknown_incident_is_not_found() {
        let fx = fixture();
        let err = fx
            .coordinator
            .acknowledge(IncidentId::new(), &UnitCode::from("AMB-01"))
            .await
            .unwrap_err();
        assert_eq!(err.code, siren_core::ErrorCode::NotFound);
    }

    // ── Mission snapshot and duty toggle ────────────────────────────────

    #[tokio::test]
    async fn current_mission_tracks_the_active_assignment() {
        let fx = fixture();
        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;
        let code = UnitCode::from("AMB-01");

        assert!(matches!(
            fx.coordinator.current_mission(&code).await.unwrap(),
            MissionView::Standby
        ));

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        match fx.coordinator.current_mission(&code).await.unwrap() {
            MissionView::Active(snapshot) => {
                assert_eq!(snapshot.incident_id, outcome.incident_id);
                assert_eq!(snapshot.status, IncidentStatus::AwaitingAcknowledgment);
                assert!(snapshot.distance_km < 0.01);
            }
            MissionView::Standby => panic!("expected an active mission"),
        }

        fx.coordinator
            .acknowledge(outcome.incident_id, &code)
            .await
            .unwrap();
        fx.coordinator.arrive(outcome.incident_id, &code).await.unwrap();
        assert!(matches!(
            fx.coordinator.current_mission(&code).await.unwrap(),
            MissionView::Standby
        ));
    }

    #[tokio::test]
    async fn duty_toggle_excludes_unit_from_dispatch_and_broadcasts() {
        let fx = fixture();
        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;
        let mut observer = fx.fanout.subscribe(UnitCode::from("AMB-02"));

        fx.coordinator
            .set_duty(&UnitCode::from("AMB-01"), false)
            .await
            .unwrap();

        match observer.receiver.try_recv().unwrap() {
            DispatchEvent::AvailabilityUpdate { unit, available } => {
                assert_eq!(unit, UnitCode::from("AMB-01"));
                assert!(!available);
            }
            other => panic!("expected availability_update, got {other:?}"),
        }

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        assert_eq!(outcome.status, IncidentStatus::NoUnitAvailable);
    }

    // ── Concurrency ─────────────────────────────────────────────────────

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transitions_keep_the_pairing_invariant() {
        let fx = fixture();
        seed_unit(&fx, "AMB-01", 10.5276, 76.2144).await;
        let code = UnitCode::from("AMB-01");

        let outcome = fx.coordinator.report_incident(THRISSUR, None).await.unwrap();
        let incident_id = outcome.incident_id;

        let mut handles = Vec::new();
        for n in 0..16 {
            let coordinator = fx.coordinator.clone();
            let code = code.clone();
            handles.push(tokio::spawn(async move {
                if n % 2 == 0 {
                    coordinator.acknowledge(incident_id, &code).await.is_ok()
                } else {
                    coordinator.decline(incident_id, &code).await.is_ok()
                }
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        // Exactly one transition wins; every later attempt is rejected.
        assert_eq!(successes, 1);
        let stored = IncidentRepository::get(&*fx.store, incident_id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.assignment_consistent());
        assert!(matches!(
            stored.status,
            IncidentStatus::InTransit | IncidentStatus::NoUnitAvailable
        ));
    }
}
