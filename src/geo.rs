#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::types::{GeoPoint, MediaType, Technician};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres (haversine).
#[must_use]
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Linear falloff: 100 at zero distance, 0 at or beyond `max_km`.
#[must_use]
pub fn distance_score(distance_km: f64, max_km: f64) -> f64 {
    if !distance_km.is_finite() || max_km <= 0.0 {
        return 0.0;
    }
    (100.0 * (1.0 - distance_km / max_km)).clamp(0.0, 100.0)
}

/// Average rating (1..=5) across `required`, scaled to 0..=100 by x20.
///
/// A required media type the technician has no rating for counts as 0.
/// No required types yields 0.
#[must_use]
pub fn skill_match_percent(technician: &Technician, required: &[MediaType]) -> f64 {
    if required.is_empty() {
        return 0.0;
    }

    let total: u32 = required
        .iter()
        .map(|media| u32::from(technician.skill_rating(media).unwrap_or(0)))
        .sum();
    let count = u32::try_from(required.len()).unwrap_or(u32::MAX);

    (f64::from(total) / f64::from(count) * 20.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::{distance_score, haversine_km, skill_match_percent};
    use crate::types::{GeoPoint, MediaType, Technician, UserId};

    #[test]
    fn haversine_matches_known_city_distance() {
        let london = GeoPoint::new(51.5074, -0.1278);
        let paris = GeoPoint::new(48.8566, 2.3522);
        let km = haversine_km(london, paris);
        assert!((km - 343.5).abs() < 2.0, "got {km}");
    }

    #[test]
    fn haversine_is_zero_for_same_point() {
        let point = GeoPoint::new(40.0, -74.0);
        assert!(haversine_km(point, point).abs() < 1e-9);
    }

    #[test]
    fn distance_score_falls_off_linearly_and_caps() {
        assert!((distance_score(0.0, 80.0) - 100.0).abs() < 1e-9);
        assert!((distance_score(40.0, 80.0) - 50.0).abs() < 1e-9);
        assert!(distance_score(120.0, 80.0).abs() < 1e-9);
        assert!(distance_score(f64::NAN, 80.0).abs() < 1e-9);
    }

    #[test]
    fn missing_skill_counts_as_zero_not_exclusion() {
        let mut tech = Technician::new(UserId::generate(), "Bo");
        tech.skills.insert(MediaType::new("photo"), 5);

        let required = [MediaType::new("photo"), MediaType::new("video")];
        assert!((skill_match_percent(&tech, &required) - 50.0).abs() < 1e-9);
        assert!(skill_match_percent(&tech, &[MediaType::new("video")]).abs() < 1e-9);
        assert!(skill_match_percent(&tech, &[]).abs() < 1e-9);
    }
}
