//! Great-circle distance on a spherical Earth.

/// Mean Earth radius used for surface distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// True for a latitude in `[-90, 90]` and a longitude in `[-180, 180]`. NaN is rejected.
#[must_use]
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Haversine distance in kilometers between two (lat, lon) points in degrees.
#[must_use]
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Haversine distance floored to whole kilometers.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn haversine_whole_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> u64 {
    haversine_km(lat1, lon1, lat2, lon2).floor().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_bounds_are_inclusive() {
        assert!(is_valid_coordinate(90.0, -180.0));
        assert!(is_valid_coordinate(-90.0, 180.0));
        assert!(!is_valid_coordinate(90.01, 0.0));
        assert!(!is_valid_coordinate(0.0, f64::NAN));
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_km(48.8566, 2.3522, 48.8566, 2.3522), 0.0);
    }

    #[test]
    fn london_to_paris_is_about_343_km() {
        let d = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((d - 343.5).abs() < 1.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = haversine_km(-35.2820, 149.1287, 35.6895, 139.6917);
        let b = haversine_km(35.6895, 139.6917, -35.2820, 149.1287);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn antipodes_are_half_circumference() {
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn whole_km_floors() {
        let exact = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert_eq!(haversine_whole_km(51.5074, -0.1278, 48.8566, 2.3522), exact.floor() as u64);
    }
}
