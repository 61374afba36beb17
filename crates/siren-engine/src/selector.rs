use siren_core::{Unit, UnitCode};
use siren_geo::{haversine_km, Coordinate};

#[derive(Debug, Clone)]
pub struct Selection {
    pub unit: Unit,
    pub distance_km: f64,
}

/// Picks the candidate closest to `location`, skipping `exclude` if given.
/// Ties keep the first-encountered unit (candidate slice order); an
/// empty filtered set yields None, which the coordinator maps to the
/// `no_unit_available` outcome rather than an error.
pub fn select_nearest(
    location: Coordinate,
    candidates: &[Unit],
    exclude: Option<&UnitCode>,
) -> Option<Selection> {
    let mut best: Option<Selection> = None;
    for unit in candidates {
        if exclude.is_some_and(|code| *code == unit.code) {
            continue;
        }
        let distance_km = haversine_km(location, unit.location);
        let closer = best
            .as_ref()
            .map_or(true, |current| distance_km < current.distance_km);
        if closer {
            best = Some(Selection {
                unit: unit.clone(),
                distance_km,
            });
        }
    }
    best
}
