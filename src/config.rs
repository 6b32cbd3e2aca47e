#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use crate::availability::AvailabilityPolicy;
use crate::calendar_sync::SyncPolicy;
use crate::error::{DispatchError, Result};
use crate::provider::ProviderConfig;
use crate::ranking::{RankingConfig, RankingWeights};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Everything the dispatch services need, resolved from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    pub database: Option<DatabaseConfig>,
    pub provider: Option<ProviderConfig>,
    pub ranking: RankingConfig,
    pub availability: AvailabilityPolicy,
    pub sync: SyncPolicy,
}

impl DispatchConfig {
    /// Load `.env` (if present) and read the process environment.
    ///
    /// # Errors
    /// `ConfigError` for unparsable values, invalid weights, or a provider
    /// URL without an API key.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    /// See [`Self::from_env`].
    pub fn from_lookup<F>(env_lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            env_lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let database = lookup("DISPATCH_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .map(|url| -> Result<DatabaseConfig> {
                Ok(DatabaseConfig {
                    url,
                    max_connections: parse_or(
                        &lookup,
                        "DISPATCH_DB_MAX_CONNECTIONS",
                        DEFAULT_DB_MAX_CONNECTIONS,
                    )?
                    .max(1),
                })
            })
            .transpose()?;

        let provider = lookup("CALENDAR_API_BASE_URL")
            .map(|base_url| -> Result<ProviderConfig> {
                let api_key = lookup("CALENDAR_API_KEY").ok_or_else(|| {
                    DispatchError::ConfigError(
                        "CALENDAR_API_KEY is required when CALENDAR_API_BASE_URL is set"
                            .to_string(),
                    )
                })?;
                let mut config = ProviderConfig::new(&base_url, api_key)?;
                config.client_id = lookup("CALENDAR_CLIENT_ID");
                config.redirect_uri = lookup("CALENDAR_REDIRECT_URI");
                if let Some(timeout_ms) = parse_opt::<u64, _>(&lookup, "CALENDAR_HTTP_TIMEOUT_MS")? {
                    config.timeout = Duration::from_millis(timeout_ms.max(1));
                }
                Ok(config)
            })
            .transpose()?;

        let defaults = RankingConfig::default();
        let weights = RankingWeights {
            availability: parse_or(
                &lookup,
                "RANKING_WEIGHT_AVAILABILITY",
                defaults.weights.availability,
            )?,
            preferred: parse_or(&lookup, "RANKING_WEIGHT_PREFERRED", defaults.weights.preferred)?,
            reliability: parse_or(
                &lookup,
                "RANKING_WEIGHT_RELIABILITY",
                defaults.weights.reliability,
            )?,
            distance: parse_or(&lookup, "RANKING_WEIGHT_DISTANCE", defaults.weights.distance)?,
            skill: parse_or(&lookup, "RANKING_WEIGHT_SKILL", defaults.weights.skill)?,
        }
        .validate()?;

        let max_distance_km = parse_or(&lookup, "RANKING_MAX_DISTANCE_KM", defaults.max_distance_km)?;
        if !(max_distance_km.is_finite() && max_distance_km > 0.0) {
            return Err(DispatchError::ConfigError(format!(
                "RANKING_MAX_DISTANCE_KM must be positive, got {max_distance_km}"
            )));
        }
        let default_job_duration_minutes = parse_or(
            &lookup,
            "DEFAULT_JOB_DURATION_MINUTES",
            defaults.default_job_duration_minutes,
        )?
        .max(1);

        let availability = AvailabilityPolicy {
            slot_step_minutes: parse_or(
                &lookup,
                "AVAILABILITY_SLOT_STEP_MINUTES",
                AvailabilityPolicy::default().slot_step_minutes,
            )?
            .max(1),
        };
        let sync = SyncPolicy {
            drift_tolerance_secs: parse_or(
                &lookup,
                "SYNC_DRIFT_TOLERANCE_SECS",
                SyncPolicy::default().drift_tolerance_secs,
            )?
            .max(0),
            default_job_duration_minutes,
        };

        Ok(Self {
            database,
            provider,
            ranking: RankingConfig {
                weights,
                max_distance_km,
                default_job_duration_minutes,
            },
            availability,
            sync,
        })
    }

    /// # Errors
    /// `ConfigError` when no database URL was configured.
    pub fn require_database(&self) -> Result<&DatabaseConfig> {
        self.database.as_ref().ok_or_else(|| {
            DispatchError::ConfigError(
                "DISPATCH_DATABASE_URL or DATABASE_URL must be set".to_string(),
            )
        })
    }
}

fn parse_opt<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| DispatchError::ConfigError(format!("{key}={raw}: {e}")))
        })
        .transpose()
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}
