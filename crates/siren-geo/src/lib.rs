use serde::{Deserialize, Serialize};

/// Spherical Earth approximation used for all distance math.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let phi_a = a.latitude.to_radians();
    let phi_b = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi_a.cos() * phi_b.cos() * (delta_lambda / 2.0).sin().powi(2);

    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero_distance() {
        let point = Coordinate::new(10.5276, 76.2144);
        assert_eq!(haversine_km(point, point), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let thrissur = Coordinate::new(10.5276, 76.2144);
        let ernakulam = Coordinate::new(9.9312, 76.2673);
        assert_eq!(
            haversine_km(thrissur, ernakulam),
            haversine_km(ernakulam, thrissur)
        );
    }

    #[test]
    fn known_pair_matches_expected_kilometers() {
        let thrissur = Coordinate::new(10.5276, 76.2144);
        let ernakulam = Coordinate::new(9.9312, 76.2673);
        let distance = haversine_km(thrissur, ernakulam);
        assert!((distance - 66.5).abs() < 1.0, "got {distance}");
    }

    #[test]
    fn distance_is_non_negative() {
        let a = Coordinate::new(-33.8688, 151.2093);
        let b = Coordinate::new(51.5074, -0.1278);
        assert!(haversine_km(a, b) > 0.0);
    }
}
