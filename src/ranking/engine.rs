use super::weights::RankingWeights;
use crate::availability::AvailabilityResolver;
use crate::error::{DispatchError, Result};
use crate::geo::{distance_score, haversine_km, skill_match_percent};
use crate::ports::{CalendarStore, TechnicianStore};
use crate::provider::CalendarProvider;
use crate::types::{Job, Technician};
use chrono::Duration;
use futures_util::future::try_join_all;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub weights: RankingWeights,
    /// Distance at which the distance factor reaches 0.
    pub max_distance_km: f64,
    /// Assumed shoot length for jobs without an end time.
    pub default_job_duration_minutes: i64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: RankingWeights::default(),
            max_distance_km: 80.0,
            default_job_duration_minutes: 60,
        }
    }
}

impl RankingConfig {
    #[must_use]
    pub fn default_job_duration(&self) -> Duration {
        Duration::minutes(self.default_job_duration_minutes.max(1))
    }
}

/// Per-factor values, each on a 0..=100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingFactors {
    pub distance_km: Option<f64>,
    pub distance: f64,
    pub availability: f64,
    pub skill_match: f64,
    pub reliability: f64,
    pub preferred: f64,
}

impl RankingFactors {
    #[must_use]
    pub fn weighted_score(&self, weights: &RankingWeights) -> f64 {
        self.availability * weights.availability
            + self.preferred * weights.preferred
            + self.reliability * weights.reliability
            + self.distance * weights.distance
            + self.skill_match * weights.skill
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub technician: Technician,
    pub score: f64,
    pub factors: RankingFactors,
}

impl RankedCandidate {
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.factors.availability > 0.0
    }
}

#[must_use]
pub fn compute_factors(
    job: &Job,
    technician: &Technician,
    available: bool,
    config: &RankingConfig,
) -> RankingFactors {
    let distance_km = job
        .location
        .zip(technician.home)
        .map(|(site, home)| haversine_km(home, site));

    RankingFactors {
        distance_km,
        distance: distance_km.map_or(0.0, |km| distance_score(km, config.max_distance_km)),
        availability: if available { 100.0 } else { 0.0 },
        skill_match: skill_match_percent(technician, &job.required_media),
        reliability: (technician.reliability.on_time_rate * 100.0).clamp(0.0, 100.0),
        preferred: if technician.is_preferred_by(&job.organization_id) {
            100.0
        } else {
            0.0
        },
    }
}

/// Scores every candidate and sorts descending; ties keep input order.
#[must_use]
pub fn rank_with_availability(
    job: &Job,
    candidates: Vec<(Technician, bool)>,
    config: &RankingConfig,
) -> Vec<RankedCandidate> {
    candidates
        .into_iter()
        .map(|(technician, available)| {
            let factors = compute_factors(job, &technician, available, config);
            RankedCandidate {
                score: factors.weighted_score(&config.weights),
                technician,
                factors,
            }
        })
        .sorted_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
        .collect()
}

/// Highest-ranked candidate that is free for the requested slot.
#[must_use]
pub fn recommended(ranked: &[RankedCandidate]) -> Option<&RankedCandidate> {
    ranked.iter().find(|candidate| candidate.is_available())
}

pub struct RankingEngine<P, C> {
    resolver: AvailabilityResolver<P, C>,
    config: RankingConfig,
}

impl<P, C> RankingEngine<P, C>
where
    P: TechnicianStore + CalendarStore + Sync,
    C: CalendarProvider + Sync,
{
    #[must_use]
    pub const fn new(resolver: AvailabilityResolver<P, C>, config: RankingConfig) -> Self {
        Self { resolver, config }
    }

    #[must_use]
    pub const fn config(&self) -> &RankingConfig {
        &self.config
    }

    /// Rank `candidates` for `job`. Output length always equals input length.
    ///
    /// # Errors
    /// `Validation` if the job's end is not after its start; store failures
    /// while resolving availability.
    pub async fn rank(&self, job: &Job, candidates: &[Technician]) -> Result<Vec<RankedCandidate>> {
        let start = job.scheduled_start;
        let end = job.effective_end(self.config.default_job_duration());
        if end <= start {
            return Err(DispatchError::Validation(format!(
                "job {} ends before it starts",
                job.id
            )));
        }

        let availability = try_join_all(
            candidates
                .iter()
                .map(|technician| self.resolver.check_for(technician, start, end)),
        )
        .await?;

        let ranked = rank_with_availability(
            job,
            candidates.iter().cloned().zip(availability).collect(),
            &self.config,
        );
        debug!(
            job_id = %job.id,
            candidates = ranked.len(),
            available = ranked.iter().filter(|candidate| candidate.is_available()).count(),
            "ranked technicians"
        );
        Ok(ranked)
    }
}
