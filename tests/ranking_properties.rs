// Properties of the pure ranking pieces: scores, ordering and distance decay.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeZone, Utc};
use dispatch::geo::{distance_score, haversine_km};
use dispatch::ranking::{compute_factors, rank_with_availability, recommended, RankingConfig};
use dispatch::{GeoPoint, Job, MediaType, OrganizationId, Technician, UserId};

fn job(org: OrganizationId) -> Job {
    let mut job = Job::new(
        org,
        "Riverside duplex",
        Utc.with_ymd_and_hms(2025, 6, 2, 10, 0, 0).unwrap(),
    );
    job.location = Some(GeoPoint::new(47.6062, -122.3321));
    job.required_media = vec![MediaType::new("photo"), MediaType::new("drone")];
    job
}

fn technician(name: &str, lat_offset: f64, photo: u8, drone: Option<u8>, on_time: f64) -> Technician {
    let mut tech = Technician::new(UserId::generate(), name);
    tech.home = Some(GeoPoint::new(47.6062 + lat_offset, -122.3321));
    tech.reliability.on_time_rate = on_time;
    tech.skills.insert(MediaType::new("photo"), photo);
    if let Some(rating) = drone {
        tech.skills.insert(MediaType::new("drone"), rating);
    }
    tech
}

fn roster() -> Vec<Technician> {
    vec![
        technician("near-expert", 0.01, 5, Some(5), 0.95),
        technician("near-novice", 0.02, 2, None, 0.70),
        technician("mid", 0.30, 4, Some(3), 0.85),
        technician("far", 1.50, 5, Some(5), 1.00),
    ]
}

#[test]
fn scores_stay_within_bounds_and_sort_descending() {
    let org = OrganizationId::generate();
    let candidates = roster()
        .into_iter()
        .enumerate()
        .map(|(index, tech)| (tech, index % 2 == 0))
        .collect();

    let ranked = rank_with_availability(&job(org), candidates, &RankingConfig::default());

    assert_eq!(ranked.len(), 4);
    assert!(ranked.iter().all(|c| (0.0..=100.0).contains(&c.score)));
    assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn every_candidate_is_returned_even_when_unavailable() {
    let org = OrganizationId::generate();
    let candidates = roster().into_iter().map(|tech| (tech, false)).collect();

    let ranked = rank_with_availability(&job(org), candidates, &RankingConfig::default());

    assert_eq!(ranked.len(), 4);
    assert!(ranked.iter().all(|c| c.factors.availability == 0.0));
    assert!(recommended(&ranked).is_none());
}

#[test]
fn distance_factor_decays_with_distance() {
    let config = RankingConfig::default();
    let org = OrganizationId::generate();
    let job = job(org);

    let factors: Vec<f64> = roster()
        .iter()
        .map(|tech| compute_factors(&job, tech, true, &config).distance)
        .collect();

    assert!(factors.windows(2).all(|pair| pair[0] >= pair[1]));
    // 1.5 degrees of latitude is ~167 km, beyond the 80 km cutoff.
    assert_eq!(factors[3], 0.0);
}

#[test]
fn preferred_flag_only_counts_for_its_organization() {
    let config = RankingConfig::default();
    let home_org = OrganizationId::generate();
    let other_org = OrganizationId::generate();
    let mut tech = technician("loyal", 0.0, 5, Some(5), 1.0);
    tech.preferred_by.insert(home_org);

    let preferred = compute_factors(&job(home_org), &tech, true, &config);
    let neutral = compute_factors(&job(other_org), &tech, true, &config);

    assert_eq!(preferred.preferred, 100.0);
    assert_eq!(neutral.preferred, 0.0);
    assert!(
        preferred.weighted_score(&config.weights) > neutral.weighted_score(&config.weights)
    );
}

#[test]
fn haversine_agrees_with_distance_score_cutoff() {
    let seattle = GeoPoint::new(47.6062, -122.3321);
    let tacoma = GeoPoint::new(47.2529, -122.4443);

    let km = haversine_km(seattle, tacoma);

    assert!((38.0..42.0).contains(&km), "got {km}");
    let score = distance_score(km, 80.0);
    assert!((score - 100.0 * (1.0 - km / 80.0)).abs() < 1e-9);
}
