#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use super::{
    compute_factors, rank_with_availability, recommended, RankingConfig, RankingEngine,
};
use crate::availability::{AvailabilityPolicy, AvailabilityResolver};
use crate::memory::{InMemoryCalendarProvider, InMemoryStore};
use crate::provider::BusyInterval;
use crate::types::{
    CalendarIntegration, ExternalCalendarId, GeoPoint, GrantId, IntegrationId,
    IntegrationStatus, Job, MediaType, OrganizationId, Technician, UserId,
};
use crate::DispatchError;
use chrono::{DateTime, Duration, TimeZone, Utc};

fn at(hour: u32) -> DateTime<Utc> {
    // Monday
    Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap()
}

fn job(org: OrganizationId) -> Job {
    let mut job = Job::new(org, "Loft listing", at(14));
    job.scheduled_end = Some(at(15));
    job.location = Some(GeoPoint::new(40.7128, -74.0060));
    job.required_media = vec![MediaType::new("video")];
    job
}

fn technician(name: &str, video: Option<u8>, on_time: f64) -> Technician {
    let mut tech = Technician::new(UserId::generate(), name);
    tech.home = Some(GeoPoint::new(40.7128, -74.0060));
    tech.reliability.on_time_rate = on_time;
    if let Some(rating) = video {
        tech.skills.insert(MediaType::new("video"), rating);
    }
    tech.skills.insert(MediaType::new("photo"), 5);
    tech
}

#[test]
fn factors_combine_with_default_weights() {
    let org = OrganizationId::generate();
    let mut tech = technician("ivy", Some(4), 0.9);
    tech.preferred_by.insert(org);

    let factors = compute_factors(&job(org), &tech, true, &RankingConfig::default());

    assert!((factors.availability - 100.0).abs() < 1e-9);
    assert!((factors.preferred - 100.0).abs() < 1e-9);
    assert!((factors.reliability - 90.0).abs() < 1e-9);
    assert!((factors.distance - 100.0).abs() < 1e-9);
    assert!((factors.skill_match - 80.0).abs() < 1e-9);

    let score = factors.weighted_score(&RankingConfig::default().weights);
    // 30 + 25 + 18 + 15 + 8
    assert!((score - 96.0).abs() < 1e-9, "got {score}");
}

#[test]
fn missing_video_skill_scores_zero_without_excluding_candidate() {
    let org = OrganizationId::generate();
    let candidates = vec![
        (technician("a", Some(5), 0.8), true),
        (technician("b", None, 0.8), true),
        (technician("c", Some(3), 0.8), true),
        (technician("d", None, 0.8), true),
        (technician("e", Some(1), 0.8), true),
    ];

    let ranked = rank_with_availability(&job(org), candidates, &RankingConfig::default());

    assert_eq!(ranked.len(), 5);
    let no_video: Vec<_> = ranked
        .iter()
        .filter(|candidate| candidate.factors.skill_match == 0.0)
        .map(|candidate| candidate.technician.display_name.as_str())
        .collect();
    assert_eq!(no_video, vec!["b", "d"]);
    assert!(ranked.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn ties_preserve_candidate_order() {
    let org = OrganizationId::generate();
    let candidates = vec![
        (technician("first", Some(3), 0.5), true),
        (technician("second", Some(3), 0.5), true),
        (technician("third", Some(3), 0.5), true),
    ];

    let ranked = rank_with_availability(&job(org), candidates, &RankingConfig::default());
    let names: Vec<_> = ranked
        .iter()
        .map(|candidate| candidate.technician.display_name.as_str())
        .collect();

    assert_eq!(names, vec!["first", "second", "third"]);
}

#[test]
fn recommendation_skips_unavailable_near_misses() {
    let org = OrganizationId::generate();
    let mut star = technician("star", Some(5), 1.0);
    star.preferred_by.insert(org);
    let candidates = vec![
        (star, false),
        (technician("steady", Some(2), 0.4), true),
    ];

    let ranked = rank_with_availability(&job(org), candidates, &RankingConfig::default());

    assert_eq!(ranked[0].technician.display_name, "star");
    assert_eq!(
        recommended(&ranked).map(|c| c.technician.display_name.as_str()),
        Some("steady")
    );
}

#[test]
fn missing_job_location_zeroes_distance_factor() {
    let org = OrganizationId::generate();
    let mut job = job(org);
    job.location = None;

    let factors = compute_factors(&job, &technician("x", Some(3), 0.5), true, &RankingConfig::default());

    assert_eq!(factors.distance_km, None);
    assert!(factors.distance.abs() < 1e-9);
}

#[tokio::test]
async fn engine_uses_busy_time_for_availability_factor() {
    let store = InMemoryStore::new();
    let provider = InMemoryCalendarProvider::new();
    let org = OrganizationId::generate();

    let busy_tech = technician("busy", Some(5), 1.0);
    let free_tech = technician("free", Some(5), 1.0);
    store
        .insert_integration(CalendarIntegration {
            id: IntegrationId::generate(),
            technician_id: busy_tech.id,
            grant_id: GrantId::new("grant-busy"),
            calendar_id: ExternalCalendarId::new("primary"),
            account_email: "busy@example.test".to_string(),
            status: IntegrationStatus::Active,
            is_write_target: true,
            connected_at: at(0),
        })
        .await;
    provider
        .set_busy(
            "busy@example.test",
            vec![BusyInterval::new(at(14) + Duration::minutes(30), at(16))],
        )
        .await;

    let engine = RankingEngine::new(
        AvailabilityResolver::new(store, provider, AvailabilityPolicy::default()),
        RankingConfig::default(),
    );
    let ranked = engine
        .rank(&job(org), &[busy_tech, free_tech])
        .await
        .unwrap();

    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].technician.display_name, "free");
    assert!(!ranked[1].is_available());
}

#[tokio::test]
async fn engine_rejects_inverted_job_window() {
    let org = OrganizationId::generate();
    let mut job = job(org);
    job.scheduled_end = Some(at(13));
    let engine = RankingEngine::new(
        AvailabilityResolver::new(
            InMemoryStore::new(),
            InMemoryCalendarProvider::new(),
            AvailabilityPolicy::default(),
        ),
        RankingConfig::default(),
    );

    let result = engine.rank(&job, &[technician("z", None, 0.1)]).await;

    assert!(matches!(result, Err(DispatchError::Validation(_))));
}
