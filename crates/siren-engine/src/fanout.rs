use crate::events::DispatchEvent;
use siren_core::{SubscriberId, UnitCode};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub const DEFAULT_EVENT_BUFFER: usize = 32;

struct Slot {
    id: SubscriberId,
    sender: mpsc::Sender<DispatchEvent>,
}

/// One live notification channel bound to a single unit. Dropping the
/// receiver ends delivery; the slot is reaped on the next publish.
pub struct Subscription {
    pub id: SubscriberId,
    pub unit: UnitCode,
    pub receiver: mpsc::Receiver<DispatchEvent>,
}

type Registry = HashMap<UnitCode, Mutex<Vec<Slot>>>;

/// Process-wide fanout, created once at service start and passed by handle.
/// Publishing to different units contends only on the per-unit slot list;
/// the outer map is write-locked only when a unit gains its first
/// subscription.
pub struct EventFanout {
    buffer: usize,
    units: RwLock<Registry>,
}

impl EventFanout {
    pub fn new(buffer: usize) -> Self {
        Self {
            buffer: buffer.max(1),
            units: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self, unit: UnitCode) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = SubscriberId::new();
        let slot = Slot { id, sender };

        {
            let units = self.read_units();
            if let Some(slots) = units.get(&unit) {
                lock_slots(slots).push(slot);
                return Subscription { id, unit, receiver };
            }
        }

        let mut units = self.write_units();
        units
            .entry(unit.clone())
            .or_default()
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push(slot);
        Subscription { id, unit, receiver }
    }

    pub fn unsubscribe(&self, unit: &UnitCode, id: SubscriberId) {
        let units = self.read_units();
        if let Some(slots) = units.get(unit) {
            lock_slots(slots).retain(|slot| slot.id != id);
        }
    }

    /// Delivers to every live subscription for `unit`. Never blocks and
    /// never errors: a full buffer drops that one event for that one
    /// subscriber.
    pub fn publish(&self, unit: &UnitCode, event: &DispatchEvent) {
        let units = self.read_units();
        if let Some(slots) = units.get(unit) {
            deliver(&mut lock_slots(slots), event);
        }
    }

    /// Delivers to every live subscription across all units.
    pub fn broadcast(&self, event: &DispatchEvent) {
        let units = self.read_units();
        for slots in units.values() {
            deliver(&mut lock_slots(slots), event);
        }
    }

    pub fn connected_subscribers(&self) -> usize {
        let units = self.read_units();
        units.values().map(|slots| lock_slots(slots).len()).sum()
    }

    fn read_units(&self) -> RwLockReadGuard<'_, Registry> {
        self.units.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_units(&self) -> RwLockWriteGuard<'_, Registry> {
        self.units.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventFanout {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER)
    }
}

fn lock_slots(slots: &Mutex<Vec<Slot>>) -> std::sync::MutexGuard<'_, Vec<Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

fn deliver(slots: &mut Vec<Slot>, event: &DispatchEvent) {
    slots.retain(|slot| match slot.sender.try_send(event.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            metrics::counter!("siren_fanout_dropped_events_total").increment(1);
            tracing::debug!(subscriber = %slot.id, "subscriber buffer full, event dropped");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    });
}
