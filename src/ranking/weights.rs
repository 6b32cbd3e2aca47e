use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};

/// Default policy: availability 30, preferred 25, reliability 20,
/// distance 15, skill 10.
pub const DEFAULT_WEIGHTS: RankingWeights = RankingWeights {
    availability: 0.30,
    preferred: 0.25,
    reliability: 0.20,
    distance: 0.15,
    skill: 0.10,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    pub availability: f64,
    pub preferred: f64,
    pub reliability: f64,
    pub distance: f64,
    pub skill: f64,
}

impl RankingWeights {
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.availability + self.preferred + self.reliability + self.distance + self.skill
    }

    /// # Errors
    /// Returns `ConfigError` when a weight is negative or not finite, or the
    /// weights do not sum to 1.0.
    pub fn validate(self) -> Result<Self> {
        let parts = [
            self.availability,
            self.preferred,
            self.reliability,
            self.distance,
            self.skill,
        ];
        if parts.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(DispatchError::ConfigError(format!(
                "ranking weights must be finite and non-negative: {self:?}"
            )));
        }
        if (self.sum() - 1.0).abs() > 1e-6 {
            return Err(DispatchError::ConfigError(format!(
                "ranking weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        Ok(self)
    }
}

impl Default for RankingWeights {
    fn default() -> Self {
        DEFAULT_WEIGHTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!((DEFAULT_WEIGHTS.sum() - 1.0).abs() < 1e-6);
        assert!(DEFAULT_WEIGHTS.validate().is_ok());
    }

    #[test]
    fn unbalanced_weights_are_rejected() {
        let weights = RankingWeights {
            skill: 0.5,
            ..DEFAULT_WEIGHTS
        };
        assert!(matches!(
            weights.validate(),
            Err(DispatchError::ConfigError(_))
        ));
    }

    #[test]
    fn negative_weights_are_rejected_even_if_balanced() {
        let weights = RankingWeights {
            availability: 0.5,
            skill: -0.1,
            ..DEFAULT_WEIGHTS
        };
        assert!(weights.validate().is_err());
    }
}
