use async_trait::async_trait;
use siren_core::{Incident, IncidentId, IncidentStatus, Unit, UnitCode};
use siren_storage::{IncidentRepository, StorageError, UnitRepository};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-process store. Units are keyed by code (stable directory order);
/// incidents keep insertion order so "most recent" is well defined.
#[derive(Debug, Default)]
pub struct MemoryStore {
    units: Mutex<BTreeMap<UnitCode, Unit>>,
    incidents: Mutex<Vec<Incident>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UnitRepository for MemoryStore {
    async fn get(&self, code: &UnitCode) -> Result<Option<Unit>, StorageError> {
        let units = self.units.lock().map_err(poisoned)?;
        Ok(units.get(code).cloned())
    }

    async fn list(&self) -> Result<Vec<Unit>, StorageError> {
        let units = self.units.lock().map_err(poisoned)?;
        Ok(units.values().cloned().collect())
    }

    async fn list_dispatchable(&self) -> Result<Vec<Unit>, StorageError> {
        let units = self.units.lock().map_err(poisoned)?;
        Ok(units
            .values()
            .filter(|unit| unit.is_dispatchable())
            .cloned()
            .collect())
    }

    async fn upsert(&self, unit: Unit) -> Result<(), StorageError> {
        let mut units = self.units.lock().map_err(poisoned)?;
        units.insert(unit.code.clone(), unit);
        Ok(())
    }

    async fn set_availability(
        &self,
        code: &UnitCode,
        available: bool,
    ) -> Result<(), StorageError> {
        let mut units = self.units.lock().map_err(poisoned)?;
        match units.get_mut(code) {
            Some(unit) => {
                unit.available = available;
                Ok(())
            }
            None => Err(StorageError::new(format!("unknown unit {code}"))),
        }
    }

    async fn set_duty(&self, code: &UnitCode, on_duty: bool) -> Result<(), StorageError> {
        let mut units = self.units.lock().map_err(poisoned)?;
        match units.get_mut(code) {
            Some(unit) => {
                unit.staffed = on_duty;
                unit.available = on_duty;
                Ok(())
            }
            None => Err(StorageError::new(format!("unknown unit {code}"))),
        }
    }
}

#[async_trait]
impl IncidentRepository for MemoryStore {
    async fn create(&self, incident: Incident) -> Result<(), StorageError> {
        let mut incidents = self.incidents.lock().map_err(poisoned)?;
        incidents.push(incident);
        Ok(())
    }

    async fn get(&self, id: IncidentId) -> Result<Option<Incident>, StorageError> {
        let incidents = self.incidents.lock().map_err(poisoned)?;
        Ok(incidents.iter().find(|row| row.id == id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Incident>, StorageError> {
        let incidents = self.incidents.lock().map_err(poisoned)?;
        Ok(incidents.iter().rev().take(limit).cloned().collect())
    }

    async fn latest_active_for_unit(
        &self,
        code: &UnitCode,
    ) -> Result<Option<Incident>, StorageError> {
        let incidents = self.incidents.lock().map_err(poisoned)?;
        Ok(incidents
            .iter()
            .rev()
            .find(|row| {
                row.status.requires_assignment() && row.assigned_unit.as_ref() == Some(code)
            })
            .cloned())
    }

    async fn update_if_status(
        &self,
        expected: IncidentStatus,
        incident: Incident,
    ) -> Result<bool, StorageError> {
        let mut incidents = self.incidents.lock().map_err(poisoned)?;
        match incidents.iter_mut().find(|row| row.id == incident.id) {
            Some(row) if row.status == expected => {
                *row = incident;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StorageError::new(format!(
                "unknown incident {}",
                incident.id
            ))),
        }
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StorageError {
    StorageError::new("memory store lock poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_geo::Coordinate;

    fn unit(code: &str, available: bool, staffed: bool) -> Unit {
        Unit {
            code: UnitCode::from(code),
            location: Coordinate::new(10.5, 76.2),
            available,
            staffed,
        }
    }

    #[tokio::test]
    async fn dispatchable_requires_both_flags() {
        let store = MemoryStore::new();
        store.upsert(unit("AMB-01", true, true)).await.unwrap();
        store.upsert(unit("AMB-02", true, false)).await.unwrap();
        store.upsert(unit("AMB-03", false, true)).await.unwrap();

        let dispatchable = store.list_dispatchable().await.unwrap();
        assert_eq!(dispatchable.len(), 1);
        assert_eq!(dispatchable[0].code, UnitCode::from("AMB-01"));
    }

    #[tokio::test]
    async fn duty_toggle_flips_both_flags() {
        let store = MemoryStore::new();
        store.upsert(unit("AMB-01", true, true)).await.unwrap();

        store
            .set_duty(&UnitCode::from("AMB-01"), false)
            .await
            .unwrap();
        let row = UnitRepository::get(&store, &UnitCode::from("AMB-01"))
            .await
            .unwrap()
            .unwrap();
        assert!(!row.available);
        assert!(!row.staffed);
    }

    #[tokio::test]
    async fn conditional_update_rejects_stale_status() {
        let store = MemoryStore::new();
        let mut incident = Incident::report(Coordinate::new(10.5276, 76.2144), None);
        store.create(incident.clone()).await.unwrap();

        incident.status = IncidentStatus::AwaitingAcknowledgment;
        incident.assigned_unit = Some(UnitCode::from("AMB-01"));
        let applied = store
            .update_if_status(IncidentStatus::New, incident.clone())
            .await
            .unwrap();
        assert!(applied);

        // Second writer still expecting `new` must lose.
        let stale = store
            .update_if_status(IncidentStatus::New, incident)
            .await
            .unwrap();
        assert!(!stale);
    }

    #[tokio::test]
    async fn latest_active_skips_terminal_rows() {
        let store = MemoryStore::new();
        let code = UnitCode::from("AMB-01");

        let mut resolved = Incident::report(Coordinate::new(10.5, 76.2), None);
        resolved.status = IncidentStatus::Resolved;
        resolved.assigned_unit = Some(code.clone());
        store.create(resolved).await.unwrap();

        assert!(store.latest_active_for_unit(&code).await.unwrap().is_none());

        let mut active = Incident::report(Coordinate::new(10.6, 76.3), None);
        active.status = IncidentStatus::InTransit;
        active.assigned_unit = Some(code.clone());
        store.create(active.clone()).await.unwrap();

        let found = store.latest_active_for_unit(&code).await.unwrap().unwrap();
        assert_eq!(found.id, active.id);
    }
}
